pub mod catalog;
pub mod config;
pub mod demo;
pub mod recording;
pub mod server;
pub mod sharing;

// Re-export commonly used types
pub use catalog::{CatalogStats, LocalVodCatalog, SearchQuery, VodCatalog, VodError};
pub use config::{IdentityProvider, LibraryConfig, StaticIdentity};
pub use recording::{CaptureBackend, PlaceholderCapture, RecordingEvent, RecordingSessionManager};
pub use sharing::{ExportFormat, ImportOutcome, SharingGateway};

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type AppState = Arc<LibraryState>;

/// Everything the HTTP surface needs, built once at startup
pub struct LibraryState {
    pub storage_dir: PathBuf,
    pub catalog: Arc<dyn VodCatalog>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: RecordingSessionManager,
    pub sharing: SharingGateway,
    /// Browser origin allowed through CORS, if any
    pub allowed_origin: Option<String>,
    scratch_dir: PathBuf,
}

impl LibraryState {
    /// Open (or create) the catalog under `storage_dir` with placeholder capture
    pub fn new<P: AsRef<Path>>(storage_dir: P, identity: StaticIdentity) -> Result<Self, VodError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        let scratch_dir = storage_dir.join("scratch");
        std::fs::create_dir_all(&scratch_dir)?;

        let catalog: Arc<dyn VodCatalog> = Arc::new(LocalVodCatalog::new(&storage_dir)?);
        let identity: Arc<dyn IdentityProvider> = Arc::new(identity);
        let capture: Arc<dyn CaptureBackend> = Arc::new(PlaceholderCapture::new(&scratch_dir));

        Ok(Self::with_parts(storage_dir, scratch_dir, catalog, identity, capture))
    }

    pub fn from_config(config: &LibraryConfig) -> Result<Self, VodError> {
        let mut state = Self::new(&config.storage_dir, config.identity.clone())?;
        state.allowed_origin = config.allowed_origin.clone();
        Ok(state)
    }

    /// Assemble the services around caller-supplied collaborators
    pub fn with_parts(
        storage_dir: PathBuf,
        scratch_dir: PathBuf,
        catalog: Arc<dyn VodCatalog>,
        identity: Arc<dyn IdentityProvider>,
        capture: Arc<dyn CaptureBackend>,
    ) -> Self {
        let sessions = RecordingSessionManager::new(catalog.clone(), identity.clone(), capture);
        let sharing = SharingGateway::new(catalog.clone(), identity.clone());
        Self {
            storage_dir,
            catalog,
            identity,
            sessions,
            sharing,
            allowed_origin: None,
            scratch_dir,
        }
    }

    /// Directory for intermediate files that are copied into the catalog
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

impl std::fmt::Debug for LibraryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryState")
            .field("storage_dir", &self.storage_dir)
            .field("catalog", &"<dyn VodCatalog>")
            .field("identity", &"<dyn IdentityProvider>")
            .field("sessions", &self.sessions)
            .field("allowed_origin", &self.allowed_origin)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}
