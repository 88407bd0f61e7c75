//! VOD metadata catalog
//!
//! This module defines the durable store that maps a VOD id to its metadata
//! document and media file, along with the error type shared by every
//! library operation.

pub mod local;
pub mod query;

use async_trait::async_trait;
use serde::Serialize;
use squadov_vod::{VodMetadata, VodRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub use local::LocalVodCatalog;
pub use query::SearchQuery;

/// Error type for catalog, session and sharing operations
#[derive(Error, Debug)]
pub enum VodError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A recording session is already active: {0}")]
    AlreadyRecording(String),

    #[error("Corrupt metadata document {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Invalid VOD id: {0:?}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Catalog write lock poisoned")]
    LockPoisoned,
}

impl VodError {
    /// HTTP status used when this error crosses the server boundary
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            VodError::NotFound(_) => StatusCode::NOT_FOUND,
            VodError::AlreadyRecording(_) => StatusCode::CONFLICT,
            VodError::Corrupt { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            VodError::InvalidId(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for VodError {
    fn from(e: tokio::task::JoinError) -> Self {
        VodError::Task(e.to_string())
    }
}

/// Aggregate numbers for one user's library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_count: usize,
    pub total_bytes: u64,
    /// Free bytes on the volume hosting the storage root, 0 if unknown
    pub available_space: u64,
    pub favorite_count: usize,
}

/// Trait for the durable VOD store
///
/// Reads never take the write lock; writes are whole-document replacements so
/// a reader sees either the old or the new document.
#[async_trait]
pub trait VodCatalog: Send + Sync {
    /// Copy `source_path` into the catalog as `{id}{ext}` and persist `metadata`
    ///
    /// `metadata.file_path` and `metadata.file_size` are rewritten to describe
    /// the copied file; an empty `metadata.id` is replaced with a fresh one.
    /// Returns the VOD id.
    async fn save(&self, source_path: &Path, metadata: &mut VodMetadata) -> Result<String, VodError>;

    /// Load one VOD, reconciling its file flags and size against disk
    async fn get(&self, id: &str) -> Result<VodRecord, VodError>;

    /// List VODs by most recently written metadata first
    ///
    /// `offset` and `limit` are applied to the document listing before the
    /// `user_id` filter; an empty `user_id` matches everyone. Unreadable
    /// documents are skipped.
    async fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<VodRecord>, VodError>;

    /// Replace the stored document for `metadata.id` (last writer wins)
    async fn update(&self, metadata: &VodMetadata) -> Result<(), VodError>;

    /// Remove the metadata document, and with `delete_file` the media and
    /// thumbnail files too. Deleting an unknown id succeeds.
    async fn delete(&self, id: &str, delete_file: bool) -> Result<(), VodError>;

    /// Free space on the volume that hosts the catalog
    async fn available_space(&self) -> Result<u64, VodError>;

    /// Filter the user's full listing, truncating to `query.limit` afterwards
    async fn search(&self, user_id: &str, query: &SearchQuery) -> Result<Vec<VodRecord>, VodError> {
        let all = self.list(user_id, usize::MAX, 0).await?;
        let results: Vec<VodRecord> = all
            .into_iter()
            .filter(|record| query.matches(&record.metadata))
            .take(query.limit)
            .collect();
        debug!("🔎 Search for user {:?} matched {} VODs", user_id, results.len());
        Ok(results)
    }

    async fn favorites(&self, user_id: &str, limit: usize) -> Result<Vec<VodRecord>, VodError> {
        let all = self.list(user_id, usize::MAX, 0).await?;
        Ok(all
            .into_iter()
            .filter(|record| record.metadata.is_favorite)
            .take(limit)
            .collect())
    }

    /// Flip `is_favorite` and persist, returning the updated record
    async fn toggle_favorite(&self, id: &str) -> Result<VodRecord, VodError> {
        let mut record = self.get(id).await?;
        record.metadata.is_favorite = !record.metadata.is_favorite;
        self.update(&record.metadata).await?;
        Ok(record)
    }

    async fn stats(&self, user_id: &str) -> Result<CatalogStats, VodError> {
        let all = self.list(user_id, usize::MAX, 0).await?;

        let available_space = match self.available_space().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to query available space: {}", e);
                0
            }
        };

        Ok(CatalogStats {
            total_count: all.len(),
            total_bytes: all.iter().map(|r| r.metadata.file_size).sum(),
            available_space,
            favorite_count: all.iter().filter(|r| r.metadata.is_favorite).count(),
        })
    }
}
