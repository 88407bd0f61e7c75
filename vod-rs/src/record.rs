// In-memory view of a VOD plus its file-presence state

use crate::format::{format_duration, format_file_size};
use crate::metadata::VodMetadata;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A VOD as seen by callers: its metadata plus whether the media file is
/// actually there.
///
/// `exists` and `is_accessible` are derived by stat-ing `metadata.file_path`
/// and are never written to disk. They may go stale between calls to
/// [`VodRecord::refresh_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodRecord {
    pub metadata: VodMetadata,
    pub exists: bool,
    pub is_accessible: bool,
}

impl VodRecord {
    /// Wrap metadata and compute the file flags immediately
    pub fn new(metadata: VodMetadata) -> Self {
        let mut record = Self {
            metadata,
            exists: false,
            is_accessible: false,
        };
        record.refresh_status();
        record
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Re-stat the media file.
    ///
    /// If the on-disk length differs from `metadata.file_size`, the metadata is
    /// corrected in memory; persisting the correction is up to the caller.
    /// Any filesystem error clears both flags rather than propagating.
    ///
    /// Returns true when `file_size` was corrected.
    pub fn refresh_status(&mut self) -> bool {
        if self.metadata.file_path.is_empty() {
            self.exists = false;
            self.is_accessible = false;
            return false;
        }

        let path = Path::new(&self.metadata.file_path);
        match fs::metadata(path) {
            Ok(stat) if stat.is_file() => {
                self.exists = true;
                self.is_accessible = true;
                if stat.len() != self.metadata.file_size {
                    self.metadata.file_size = stat.len();
                    return true;
                }
                false
            }
            _ => {
                self.exists = false;
                self.is_accessible = false;
                false
            }
        }
    }

    pub fn formatted_file_size(&self) -> String {
        format_file_size(self.metadata.file_size)
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.metadata.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_empty_path_is_missing() {
        let record = VodRecord::new(VodMetadata::new());
        assert!(!record.exists);
        assert!(!record.is_accessible);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut meta = VodMetadata::new();
        meta.file_path = temp_dir.path().join("gone.mp4").to_string_lossy().to_string();
        meta.file_size = 42;

        let record = VodRecord::new(meta);
        assert!(!record.exists);
        assert!(!record.is_accessible);
        // Size is only reconciled against files that exist
        assert_eq!(record.metadata.file_size, 42);
    }

    #[test]
    fn test_refresh_heals_file_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 300]).unwrap();

        let mut meta = VodMetadata::new();
        meta.file_path = path.to_string_lossy().to_string();
        meta.file_size = 10;

        let mut record = VodRecord::new(meta);
        assert!(record.exists);
        assert!(record.is_accessible);
        assert_eq!(record.metadata.file_size, 300);

        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        assert!(record.refresh_status());
        assert_eq!(record.metadata.file_size, 2048);
        assert!(!record.refresh_status());

        std::fs::remove_file(&path).unwrap();
        record.refresh_status();
        assert!(!record.exists);
    }

    #[test]
    fn test_formatting_helpers() {
        let mut meta = VodMetadata::new();
        meta.file_size = 5 * 1024 * 1024;
        meta.duration = Duration::from_secs(3725);
        let record = VodRecord {
            metadata: meta,
            exists: false,
            is_accessible: false,
        };
        assert_eq!(record.formatted_file_size(), "5.00 MB");
        assert_eq!(record.formatted_duration(), "1:02:05");
    }
}
