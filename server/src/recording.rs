//! Recording session lifecycle
//!
//! Mediates between start/stop requests and a durable VOD record. At most one
//! session is current at a time; stopping it hands the finished capture to the
//! catalog and announces the result to subscribers.

use crate::catalog::{VodCatalog, VodError};
use crate::config::{IdentityProvider, UNKNOWN_USER};
use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use squadov_vod::{RecordingSession, VodMetadata, VodRecord};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_TAGS: [&str; 2] = ["recorded", "gameplay"];

/// Lifecycle notifications, sent after the corresponding state change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordingEvent {
    #[serde(rename_all = "camelCase")]
    Started { session_id: String },
    /// `record` is `None` when the recording could not be persisted
    Stopped { record: Option<VodRecord> },
}

/// The capture engine that produces the media file for a session
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Called once the session has been admitted, before it becomes current
    async fn begin(&self, session: &RecordingSession) -> Result<(), VodError>;

    /// Finish capturing and return the path of the finished recording
    async fn finish(&self, session: &RecordingSession, elapsed: Duration) -> Result<PathBuf, VodError>;
}

/// Stand-in capture engine that writes random bytes
///
/// Produces `recording_{session_id}.mp4` of roughly 100 KiB per recorded
/// minute (minimum 1 KiB) in its scratch directory.
#[derive(Debug, Clone)]
pub struct PlaceholderCapture {
    scratch_dir: PathBuf,
}

impl PlaceholderCapture {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn placeholder_size(elapsed: Duration) -> usize {
        let bytes = elapsed.as_secs_f64() / 60.0 * 100.0 * 1024.0;
        (bytes as usize).max(1024)
    }
}

#[async_trait]
impl CaptureBackend for PlaceholderCapture {
    async fn begin(&self, session: &RecordingSession) -> Result<(), VodError> {
        debug!("🎬 Placeholder capture armed for session {}", session.id);
        Ok(())
    }

    async fn finish(&self, session: &RecordingSession, elapsed: Duration) -> Result<PathBuf, VodError> {
        let dir = self.scratch_dir.clone();
        let path = dir.join(format!("recording_{}.mp4", session.id));
        let size = Self::placeholder_size(elapsed);

        let written = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), VodError> {
            fs::create_dir_all(&dir)?;
            let mut data = vec![0u8; size];
            rand::rng().fill_bytes(&mut data);
            fs::write(&written, data)?;
            Ok(())
        })
        .await??;

        debug!("Placeholder capture wrote {} bytes to {:?}", size, path);
        Ok(path)
    }
}

#[derive(Debug, Default)]
struct SessionTable {
    active: HashMap<String, RecordingSession>,
    current: Option<String>,
}

/// Owns the single-current-session state and the stop → catalog hand-off
pub struct RecordingSessionManager {
    core: Arc<SessionCore>,
}

struct SessionCore {
    catalog: Arc<dyn VodCatalog>,
    identity: Arc<dyn IdentityProvider>,
    capture: Arc<dyn CaptureBackend>,
    sessions: Mutex<SessionTable>,
    events: broadcast::Sender<RecordingEvent>,
}

impl std::fmt::Debug for RecordingSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSessionManager")
            .field("catalog", &"<dyn VodCatalog>")
            .field("identity", &"<dyn IdentityProvider>")
            .field("capture", &"<dyn CaptureBackend>")
            .field("sessions", &self.core.sessions)
            .finish()
    }
}

impl RecordingSessionManager {
    pub fn new(
        catalog: Arc<dyn VodCatalog>,
        identity: Arc<dyn IdentityProvider>,
        capture: Arc<dyn CaptureBackend>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core: Arc::new(SessionCore {
                catalog,
                identity,
                capture,
                sessions: Mutex::new(SessionTable::default()),
                events,
            }),
        }
    }

    /// Receive `RecordingEvent`s from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.core.events.subscribe()
    }

    pub async fn is_recording(&self) -> bool {
        self.core.sessions.lock().await.current.is_some()
    }

    pub async fn current_session(&self) -> Option<RecordingSession> {
        let table = self.core.sessions.lock().await;
        table
            .current
            .as_ref()
            .and_then(|id| table.active.get(id))
            .cloned()
    }

    /// Start a new session and make it current
    ///
    /// Fails with [`VodError::AlreadyRecording`] while another session is current.
    pub async fn start_recording(&self, game_id: &str, game_name: &str) -> Result<String, VodError> {
        let core = &self.core;
        let mut table = core.sessions.lock().await;
        if let Some(current) = &table.current {
            return Err(VodError::AlreadyRecording(current.clone()));
        }

        let user_id = Some(core.identity.current_user_id())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        let session = RecordingSession::new(Uuid::new_v4().to_string(), game_id, game_name, user_id);

        core.capture.begin(&session).await?;

        let session_id = session.id.clone();
        table.active.insert(session_id.clone(), session);
        table.current = Some(session_id.clone());

        info!("🔴 Recording started: session={} game={}", session_id, game_id);
        // Sent under the lock so no Stopped for this session can precede it
        core.notify(RecordingEvent::Started {
            session_id: session_id.clone(),
        });
        drop(table);
        Ok(session_id)
    }

    /// Stop the current session and persist it as a VOD
    ///
    /// Returns `Ok(None)` when `session_id` is unknown or not current, leaving
    /// the current session untouched. On a match the session is cleared whether
    /// or not persistence succeeds. The work runs on its own task, so it
    /// completes even if the caller stops waiting.
    pub async fn stop_recording(
        &self,
        session_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Option<VodRecord>, VodError> {
        let core = self.core.clone();
        let session_id = session_id.to_string();
        let title = title.to_string();
        let description = description.to_string();

        tokio::spawn(async move { core.stop(&session_id, &title, &description).await }).await?
    }
}

impl SessionCore {
    async fn stop(
        &self,
        session_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Option<VodRecord>, VodError> {
        let mut table = self.sessions.lock().await;

        let session = match table.active.get(session_id) {
            Some(session) if table.current.as_deref() == Some(session_id) => session.clone(),
            _ => {
                debug!("Ignoring stop for non-current session {}", session_id);
                return Ok(None);
            }
        };

        let result = self.persist(&session, title, description).await;

        table.active.remove(session_id);
        table.current = None;
        drop(table);

        match result {
            Ok(record) => {
                info!(
                    "⏹️  Recording stopped: session={} vod={} ({})",
                    session_id,
                    record.id(),
                    record.formatted_duration()
                );
                self.notify(RecordingEvent::Stopped {
                    record: Some(record.clone()),
                });
                Ok(Some(record))
            }
            Err(e) => {
                error!("❌ Failed to persist recording for session {}: {}", session_id, e);
                self.notify(RecordingEvent::Stopped { record: None });
                Err(e)
            }
        }
    }

    async fn persist(
        &self,
        session: &RecordingSession,
        title: &str,
        description: &str,
    ) -> Result<VodRecord, VodError> {
        let duration = session.elapsed(Utc::now());
        let recorded_path = self.capture.finish(session, duration).await?;

        let mut metadata = build_metadata(session, title, description, duration);
        let saved = self.catalog.save(&recorded_path, &mut metadata).await;

        // Either the catalog holds its own copy now or the capture is unusable
        if let Err(e) = tokio::fs::remove_file(&recorded_path).await {
            warn!("Failed to remove capture file {:?}: {}", recorded_path, e);
        }

        metadata.id = saved?;
        Ok(tokio::task::spawn_blocking(move || VodRecord::new(metadata)).await?)
    }

    fn notify(&self, event: RecordingEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for recording event");
        }
    }
}

/// Metadata for a finished session, with caller-supplied text or defaults
pub fn build_metadata(
    session: &RecordingSession,
    title: &str,
    description: &str,
    duration: Duration,
) -> VodMetadata {
    let mut metadata = VodMetadata::new();
    metadata.user_id = session.user_id.clone();
    metadata.game_id = session.game_id.clone();
    metadata.game_name = session.game_name.clone();
    metadata.title = if title.is_empty() {
        format!("{} Recording", session.game_name)
    } else {
        title.to_string()
    };
    metadata.description = if description.is_empty() {
        format!("Recorded on {}", session.start_time.format("%Y-%m-%d"))
    } else {
        description.to_string()
    };
    metadata.created_at = session.start_time;
    metadata.duration = duration;
    metadata.tags = DEFAULT_TAGS.iter().map(|t| t.to_string()).collect();
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LocalVodCatalog;
    use crate::config::StaticIdentity;
    use std::path::Path;
    use tempfile::TempDir;

    struct BrokenCapture;

    #[async_trait]
    impl CaptureBackend for BrokenCapture {
        async fn begin(&self, _session: &RecordingSession) -> Result<(), VodError> {
            Ok(())
        }

        async fn finish(&self, _session: &RecordingSession, _elapsed: Duration) -> Result<PathBuf, VodError> {
            Err(VodError::NotFound("capture produced no file".to_string()))
        }
    }

    /// Placeholder capture that takes a while to finalize
    struct SlowCapture(PlaceholderCapture);

    #[async_trait]
    impl CaptureBackend for SlowCapture {
        async fn begin(&self, session: &RecordingSession) -> Result<(), VodError> {
            self.0.begin(session).await
        }

        async fn finish(&self, session: &RecordingSession, elapsed: Duration) -> Result<PathBuf, VodError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.0.finish(session, elapsed).await
        }
    }

    fn create_manager(capture: Arc<dyn CaptureBackend>) -> (Arc<RecordingSessionManager>, Arc<LocalVodCatalog>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(LocalVodCatalog::new(temp_dir.path().join("VOD")).unwrap());
        let identity = Arc::new(StaticIdentity::new("alice", "device-1"));
        let manager = Arc::new(RecordingSessionManager::new(
            catalog.clone(),
            identity,
            capture,
        ));
        (manager, catalog, temp_dir)
    }

    fn placeholder(temp_dir: &Path) -> Arc<dyn CaptureBackend> {
        Arc::new(PlaceholderCapture::new(temp_dir.join("scratch")))
    }

    #[test]
    fn test_placeholder_size() {
        assert_eq!(PlaceholderCapture::placeholder_size(Duration::ZERO), 1024);
        assert_eq!(
            PlaceholderCapture::placeholder_size(Duration::from_secs(120)),
            200 * 1024
        );
    }

    #[test]
    fn test_build_metadata_defaults() {
        let session = RecordingSession::new("s1".to_string(), "cs2", "Counter-Strike 2", "bob".to_string());
        let meta = build_metadata(&session, "", "", Duration::from_secs(30));

        assert_eq!(meta.title, "Counter-Strike 2 Recording");
        assert_eq!(
            meta.description,
            format!("Recorded on {}", session.start_time.format("%Y-%m-%d"))
        );
        assert_eq!(meta.tags, vec!["recorded", "gameplay"]);
        assert_eq!(meta.user_id, "bob");
        assert_eq!(meta.created_at, session.start_time);

        let custom = build_metadata(&session, "Inferno retake", "late round", Duration::ZERO);
        assert_eq!(custom.title, "Inferno retake");
        assert_eq!(custom.description, "late round");
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let scratch = TempDir::new().unwrap();
        let (manager, _catalog, _temp_dir) = create_manager(placeholder(scratch.path()));

        let first = manager.start_recording("valorant", "Valorant").await.unwrap();
        assert!(manager.is_recording().await);

        match manager.start_recording("cs2", "Counter-Strike 2").await {
            Err(VodError::AlreadyRecording(current)) => assert_eq!(current, first),
            other => panic!("expected AlreadyRecording, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_unknown_session_is_a_no_op() {
        let scratch = TempDir::new().unwrap();
        let (manager, _catalog, _temp_dir) = create_manager(placeholder(scratch.path()));

        assert_eq!(manager.stop_recording("nope", "", "").await.unwrap(), None);

        let current = manager.start_recording("valorant", "Valorant").await.unwrap();
        assert_eq!(manager.stop_recording("someone-else", "", "").await.unwrap(), None);

        let session = manager.current_session().await.unwrap();
        assert_eq!(session.id, current);
        assert_eq!(session.user_id, "alice");
    }

    #[tokio::test]
    async fn test_stop_persists_vod() {
        let scratch = TempDir::new().unwrap();
        let (manager, catalog, _temp_dir) = create_manager(placeholder(scratch.path()));

        let session_id = manager.start_recording("valorant", "Valorant").await.unwrap();
        let record = manager
            .stop_recording(&session_id, "", "")
            .await
            .unwrap()
            .expect("stop should produce a record");

        assert!(record.exists);
        assert_eq!(record.metadata.title, "Valorant Recording");
        assert_eq!(record.metadata.user_id, "alice");
        assert_eq!(record.metadata.file_size, 1024);
        assert!(record.metadata.file_path.ends_with(&format!("{}.mp4", record.id())));

        let stored = catalog.get(record.id()).await.unwrap();
        assert_eq!(stored.metadata, record.metadata);

        assert!(!manager.is_recording().await);
        // A new session can start right away
        manager.start_recording("cs2", "Counter-Strike 2").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_persist_still_clears_session() {
        let (manager, catalog, _temp_dir) = create_manager(Arc::new(BrokenCapture));
        let mut events = manager.subscribe();

        let session_id = manager.start_recording("lol", "League of Legends").await.unwrap();
        let result = manager.stop_recording(&session_id, "", "").await;
        assert!(matches!(result, Err(VodError::NotFound(_))));
        assert!(!manager.is_recording().await);
        assert!(catalog.list("", 100, 0).await.unwrap().is_empty());

        assert_eq!(
            events.recv().await.unwrap(),
            RecordingEvent::Started { session_id }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            RecordingEvent::Stopped { record: None }
        );
    }

    #[tokio::test]
    async fn test_subscriber_can_restart_from_stop_event() {
        let scratch = TempDir::new().unwrap();
        let (manager, _catalog, _temp_dir) = create_manager(placeholder(scratch.path()));
        let mut events = manager.subscribe();

        let listener = {
            let manager = manager.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await.unwrap() {
                        RecordingEvent::Stopped { record } => {
                            assert!(record.is_some());
                            return manager.start_recording("cs2", "Counter-Strike 2").await;
                        }
                        RecordingEvent::Started { .. } => continue,
                    }
                }
            })
        };

        let session_id = manager.start_recording("valorant", "Valorant").await.unwrap();
        manager.stop_recording(&session_id, "", "").await.unwrap();

        let restarted = listener.await.unwrap().unwrap();
        assert_ne!(restarted, session_id);
        assert_eq!(manager.current_session().await.unwrap().id, restarted);
    }

    #[tokio::test]
    async fn test_abandoned_stop_still_completes() {
        let scratch = TempDir::new().unwrap();
        let capture = Arc::new(SlowCapture(PlaceholderCapture::new(scratch.path().join("scratch"))));
        let (manager, catalog, _temp_dir) = create_manager(capture);
        let mut events = manager.subscribe();

        let session_id = manager.start_recording("valorant", "Valorant").await.unwrap();
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            manager.stop_recording(&session_id, "", ""),
        )
        .await;
        assert!(abandoned.is_err());

        assert!(matches!(events.recv().await.unwrap(), RecordingEvent::Started { .. }));
        match events.recv().await.unwrap() {
            RecordingEvent::Stopped { record } => assert!(record.is_some()),
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert!(!manager.is_recording().await);
        assert_eq!(catalog.list("", 100, 0).await.unwrap().len(), 1);

        // Retrying the stop does not produce a second VOD
        assert_eq!(manager.stop_recording(&session_id, "", "").await.unwrap(), None);
        assert_eq!(catalog.list("", 100, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_removes_capture_file() {
        let scratch = TempDir::new().unwrap();
        let (manager, catalog, _temp_dir) = create_manager(placeholder(scratch.path()));

        let session_id = manager.start_recording("cs2", "Counter-Strike 2").await.unwrap();
        fs::remove_dir_all(catalog.root()).unwrap();

        assert!(manager.stop_recording(&session_id, "", "").await.is_err());
        assert!(!manager.is_recording().await);
        let leftovers = fs::read_dir(scratch.path().join("scratch")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
