//! Export, import and share-link operations layered on the catalog
//!
//! Adds no durable state of its own. Export copies media as-is; nothing here
//! transcodes.

use crate::catalog::{VodCatalog, VodError};
use crate::config::{IdentityProvider, UNKNOWN_USER};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use squadov_vod::VodMetadata;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const SHARE_LINK_PREFIX: &str = "squadov://share/";

/// A container format the library can hand out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFormat {
    pub name: &'static str,
    pub extension: &'static str,
    pub description: &'static str,
    pub requires_conversion: bool,
}

const SUPPORTED_FORMATS: [ExportFormat; 4] = [
    ExportFormat {
        name: "MP4",
        extension: ".mp4",
        description: "MPEG-4 Video (Original)",
        requires_conversion: false,
    },
    ExportFormat {
        name: "AVI",
        extension: ".avi",
        description: "Audio Video Interleave (Original)",
        requires_conversion: false,
    },
    ExportFormat {
        name: "MKV",
        extension: ".mkv",
        description: "Matroska Video (Original)",
        requires_conversion: false,
    },
    ExportFormat {
        name: "MOV",
        extension: ".mov",
        description: "QuickTime Movie (Original)",
        requires_conversion: false,
    },
];

/// Result of an import, shaped for callers that branch on values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vod_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<Result<String, VodError>> for ImportOutcome {
    fn from(result: Result<String, VodError>) -> Self {
        match result {
            Ok(vod_id) => Self {
                success: true,
                vod_id: Some(vod_id),
                error_message: None,
            },
            Err(e) => Self {
                success: false,
                vod_id: None,
                error_message: Some(e.to_string()),
            },
        }
    }
}

pub struct SharingGateway {
    catalog: Arc<dyn VodCatalog>,
    identity: Arc<dyn IdentityProvider>,
}

impl SharingGateway {
    pub fn new(catalog: Arc<dyn VodCatalog>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { catalog, identity }
    }

    pub fn supported_formats(&self) -> &'static [ExportFormat] {
        &SUPPORTED_FORMATS
    }

    /// Copy a VOD's media file to `destination`, overwriting it
    ///
    /// With `include_metadata`, the metadata document is written beside it
    /// with the extension replaced by `.json`. Returns the media path written.
    pub async fn export(
        &self,
        vod_id: &str,
        destination: &Path,
        include_metadata: bool,
    ) -> Result<PathBuf, VodError> {
        let record = self.catalog.get(vod_id).await?;
        if !record.exists {
            return Err(VodError::NotFound(format!("Media file for VOD {}", vod_id)));
        }

        let sidecar = destination.with_extension("json");
        if include_metadata && sidecar == destination {
            return Err(VodError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Export destination would be overwritten by its metadata sidecar",
            )));
        }

        let destination = destination.to_path_buf();
        let written = destination.clone();
        let metadata = record.metadata;
        tokio::task::spawn_blocking(move || -> Result<(), VodError> {
            // Copying a file onto itself truncates it before reading
            if let Ok(existing) = fs::canonicalize(&written) {
                if existing == fs::canonicalize(&metadata.file_path)? {
                    return Err(VodError::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Export destination is the VOD's own media file",
                    )));
                }
            }
            fs::copy(&metadata.file_path, &written)?;
            if include_metadata {
                fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;
            }
            Ok(())
        })
        .await??;

        info!("📤 Exported VOD {} to {:?}", vod_id, destination);
        Ok(destination)
    }

    /// Build an opaque `squadov://share/...` token for a VOD on this device
    pub async fn generate_share_link(&self, vod_id: &str) -> Result<String, VodError> {
        self.catalog.get(vod_id).await?;

        let share_id = format!("{}:{}", self.identity.device_id(), vod_id);
        let link = format!("{}{}", SHARE_LINK_PREFIX, STANDARD.encode(share_id));
        debug!("Generated share link for {}", vod_id);
        Ok(link)
    }

    /// Copy an external file into the catalog
    ///
    /// Without `metadata`, defaults are derived from the file: title from the
    /// file name, creation time and size from its attributes.
    pub async fn import(
        &self,
        source_path: &Path,
        metadata: Option<VodMetadata>,
    ) -> Result<String, VodError> {
        let source = source_path.to_path_buf();
        let stat = match tokio::fs::metadata(&source).await {
            Ok(stat) if stat.is_file() => stat,
            Ok(_) => return Err(VodError::NotFound(format!("Source file not found: {}", source.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VodError::NotFound(format!("Source file not found: {}", source.display())));
            }
            Err(e) => return Err(e.into()),
        };

        let mut metadata = match metadata {
            Some(metadata) => metadata,
            None => self.default_import_metadata(&source, &stat),
        };

        let vod_id = self.catalog.save(&source, &mut metadata).await?;
        info!("📥 Imported {:?} as VOD {}", source, vod_id);
        Ok(vod_id)
    }

    fn default_import_metadata(&self, source: &Path, stat: &fs::Metadata) -> VodMetadata {
        let mut metadata = VodMetadata::new();
        metadata.title = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        metadata.description = "Imported VOD".to_string();
        metadata.user_id = Some(self.identity.current_user_id())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        metadata.game_name = "Unknown".to_string();
        metadata.created_at = stat
            .created()
            .or_else(|_| stat.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        metadata.file_size = stat.len();
        metadata
    }
}

/// Split a share link back into `(device_id, vod_id)`
pub fn parse_share_link(link: &str) -> Option<(String, String)> {
    let token = link.strip_prefix(SHARE_LINK_PREFIX)?;
    let decoded = STANDARD.decode(token).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (device_id, vod_id) = decoded.rsplit_once(':')?;
    Some((device_id.to_string(), vod_id.to_string()))
}
