//! Local filesystem implementation of the VodCatalog trait
//!
//! Layout under the storage root:
//!   - `{id}{ext}`            media files
//!   - `metadata/{id}.json`   metadata documents
//!   - `thumbnails/`          thumbnail images

use crate::catalog::{VodCatalog, VodError};
use squadov_vod::{VodMetadata, VodRecord};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const METADATA_DIR: &str = "metadata";
const THUMBNAIL_DIR: &str = "thumbnails";

/// Filesystem-backed VOD catalog
#[derive(Clone)]
pub struct LocalVodCatalog {
    root: PathBuf,
    metadata_dir: PathBuf,
    thumbnail_dir: PathBuf,
    // One lock per catalog instance, not per file
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalVodCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalVodCatalog")
            .field("root", &self.root)
            .finish()
    }
}

impl LocalVodCatalog {
    /// Open (and create if needed) a catalog rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, VodError> {
        let root = root.as_ref().to_path_buf();
        let metadata_dir = root.join(METADATA_DIR);
        let thumbnail_dir = root.join(THUMBNAIL_DIR);

        fs::create_dir_all(&root)?;
        fs::create_dir_all(&metadata_dir)?;
        fs::create_dir_all(&thumbnail_dir)?;

        info!("Initialized LocalVodCatalog at {:?}", root);
        Ok(Self {
            root,
            metadata_dir,
            thumbnail_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thumbnail_dir(&self) -> &Path {
        &self.thumbnail_dir
    }

    pub fn metadata_path(&self, id: &str) -> PathBuf {
        self.metadata_dir.join(format!("{}.json", id))
    }

    /// Media path for `id`, keeping the source's extension (with its dot)
    pub fn media_path(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, extension))
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, VodError> {
        self.write_lock.lock().map_err(|_| VodError::LockPoisoned)
    }

    /// Run blocking filesystem work off the async runtime
    async fn blocking<T, F>(&self, work: F) -> Result<T, VodError>
    where
        T: Send + 'static,
        F: FnOnce(LocalVodCatalog) -> Result<T, VodError> + Send + 'static,
    {
        let catalog = self.clone();
        tokio::task::spawn_blocking(move || work(catalog)).await?
    }

    /// Read and parse one metadata document
    fn read_document(path: &Path) -> Result<VodMetadata, VodError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VodError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut metadata: VodMetadata =
            serde_json::from_str(&json).map_err(|e| VodError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if metadata.id.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                metadata.id = stem.to_string();
            }
        }
        Ok(metadata)
    }

    /// Write the document via a temporary file. Caller holds the write lock.
    fn write_document(&self, metadata: &VodMetadata) -> Result<(), VodError> {
        let final_path = self.metadata_path(&metadata.id);
        let temp_path = self.metadata_dir.join(format!("{}.json.tmp", metadata.id));

        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &final_path)?;

        debug!("Wrote metadata for {} at {:?}", metadata.id, final_path);
        Ok(())
    }

    fn save_blocking(&self, source: &Path, mut metadata: VodMetadata) -> Result<VodMetadata, VodError> {
        validate_id(&metadata.id)?;
        if !source.is_file() {
            return Err(VodError::NotFound(format!(
                "Source file not found: {}",
                source.display()
            )));
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let destination = self.media_path(&metadata.id, &extension);
        let temp_path = self.root.join(format!(".{}{}.tmp", metadata.id, extension));

        let _guard = self.lock_writes()?;

        // Copy beside the destination, then swap in; this overwrites any
        // existing media for the id and tolerates source == destination.
        fs::copy(source, &temp_path)?;
        fs::rename(&temp_path, &destination)?;

        metadata.file_path = destination.to_string_lossy().to_string();
        metadata.file_size = fs::metadata(&destination)?.len();
        self.write_document(&metadata)?;

        info!(
            "💾 Saved VOD {} ({} bytes) from {:?}",
            metadata.id, metadata.file_size, source
        );
        Ok(metadata)
    }

    fn get_blocking(&self, id: &str) -> Result<VodRecord, VodError> {
        validate_id(id)?;
        let path = self.metadata_path(id);

        match Self::read_document(&path) {
            Ok(metadata) => Ok(VodRecord::new(metadata)),
            Err(VodError::NotFound(_)) => Err(VodError::NotFound(id.to_string())),
            Err(VodError::Corrupt { path, reason }) => {
                warn!("⚠️  Treating corrupt metadata {:?} as missing: {}", path, reason);
                Err(VodError::NotFound(id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn list_blocking(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<VodRecord>, VodError> {
        let mut documents: Vec<(PathBuf, SystemTime)> = Vec::new();

        for entry in fs::read_dir(&self.metadata_dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Skipping unreadable catalog entry: {}", e);
                    continue;
                }
            };
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            documents.push((path, modified));
        }

        // Most recently written metadata first
        documents.sort_by(|a, b| b.1.cmp(&a.1));

        let mut records = Vec::new();
        for (path, _) in documents.into_iter().skip(offset).take(limit) {
            match Self::read_document(&path) {
                Ok(metadata) => {
                    if user_id.is_empty() || metadata.user_id == user_id {
                        records.push(VodRecord::new(metadata));
                    }
                }
                Err(e) => {
                    warn!("⚠️  Skipping metadata document {:?}: {}", path, e);
                }
            }
        }

        Ok(records)
    }

    fn update_blocking(&self, metadata: &VodMetadata) -> Result<(), VodError> {
        validate_id(&metadata.id)?;
        let _guard = self.lock_writes()?;
        self.write_document(metadata)
    }

    fn delete_blocking(&self, id: &str, delete_file: bool) -> Result<(), VodError> {
        validate_id(id)?;
        let metadata_path = self.metadata_path(id);

        let _guard = self.lock_writes()?;

        if delete_file {
            match Self::read_document(&metadata_path) {
                Ok(metadata) => {
                    remove_if_present(&metadata.file_path)?;
                    remove_if_present(&metadata.thumbnail_path)?;
                }
                Err(VodError::NotFound(_)) => {}
                Err(e) => warn!("Cannot locate media for {}, removing metadata only: {}", id, e),
            }
        }

        match fs::remove_file(&metadata_path) {
            Ok(()) => info!("🗑️  Deleted VOD {} (media removed: {})", id, delete_file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Delete of unknown VOD {} is a no-op", id);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Reject ids that could escape the catalog directories
fn validate_id(id: &str) -> Result<(), VodError> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(VodError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn remove_if_present(path: &str) -> Result<(), VodError> {
    if path.is_empty() {
        return Ok(());
    }
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl VodCatalog for LocalVodCatalog {
    async fn save(&self, source_path: &Path, metadata: &mut VodMetadata) -> Result<String, VodError> {
        let source = source_path.to_path_buf();
        let mut pending = metadata.clone();
        if pending.id.is_empty() {
            pending.id = uuid::Uuid::new_v4().to_string();
        }
        let saved = self
            .blocking(move |catalog| catalog.save_blocking(&source, pending))
            .await?;
        *metadata = saved;
        Ok(metadata.id.clone())
    }

    async fn get(&self, id: &str) -> Result<VodRecord, VodError> {
        let id = id.to_string();
        self.blocking(move |catalog| catalog.get_blocking(&id)).await
    }

    async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<VodRecord>, VodError> {
        let user_id = user_id.to_string();
        self.blocking(move |catalog| catalog.list_blocking(&user_id, limit, offset))
            .await
    }

    async fn update(&self, metadata: &VodMetadata) -> Result<(), VodError> {
        let metadata = metadata.clone();
        self.blocking(move |catalog| catalog.update_blocking(&metadata)).await
    }

    async fn delete(&self, id: &str, delete_file: bool) -> Result<(), VodError> {
        let id = id.to_string();
        self.blocking(move |catalog| catalog.delete_blocking(&id, delete_file))
            .await
    }

    async fn available_space(&self) -> Result<u64, VodError> {
        self.blocking(|catalog| Ok(fs2::available_space(&catalog.root)?))
            .await
    }
}
