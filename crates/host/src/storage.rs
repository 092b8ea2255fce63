//! Upload and result files on disk
//!
//! Every upload is stored as `<uuid>.<ext>` and its processed result as
//! `<uuid>.png`, so client-supplied names never reach the filesystem.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::StorageConfig;

/// Image types accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unsupported file type")]
    UnsupportedType,
    #[error("Invalid result id")]
    InvalidId,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercased extension of an uploaded filename, if it is an allowed image type
pub fn upload_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn allowed_file(filename: &str) -> bool {
    upload_extension(filename).is_some()
}

/// A stored upload
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
    results_dir: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            results_dir: config.results_dir.clone(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Write an uploaded image under a fresh id
    pub async fn save_upload(&self, filename: &str, data: &[u8]) -> Result<SavedUpload, StorageError> {
        let ext = upload_extension(filename).ok_or(StorageError::UnsupportedType)?;
        let id = Uuid::new_v4().to_string();
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(format!("{id}.{ext}"));
        tokio::fs::write(&path, data).await?;
        tracing::debug!(id = %id, bytes = data.len(), "Stored upload");
        Ok(SavedUpload { id, path })
    }

    /// File name of the result for an id
    pub fn result_filename(id: &str) -> Result<String, StorageError> {
        Ok(format!("{}.png", Self::canonical_id(id)?))
    }

    /// Hyphenated lowercase form of any uuid spelling
    pub fn canonical_id(id: &str) -> Result<String, StorageError> {
        Uuid::parse_str(id)
            .map(|id| id.to_string())
            .map_err(|_| StorageError::InvalidId)
    }

    /// Path of the result for an id (which may not exist yet)
    pub fn result_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.results_dir.join(Self::result_filename(id)?))
    }

    /// Path of an existing result
    pub fn existing_result(&self, id: &str) -> Option<PathBuf> {
        self.result_path(id).ok().filter(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path) -> Storage {
        Storage::new(&StorageConfig {
            upload_dir: dir.join("uploads"),
            results_dir: dir.join("results"),
        })
    }

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("cat.png"));
        assert!(allowed_file("photo.final.JPEG"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file("archive.png.zip"));
    }

    #[tokio::test]
    async fn test_save_upload_uses_uuid_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let saved = storage.save_upload("../../etc/Cat.PNG", b"data").await.unwrap();
        assert!(Uuid::parse_str(&saved.id).is_ok());
        assert_eq!(saved.path, dir.path().join("uploads").join(format!("{}.png", saved.id)));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_save_upload_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let err = storage(dir.path()).save_upload("doc.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedType));
    }

    #[test]
    fn test_result_path_requires_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        assert!(matches!(storage.result_path("../secret"), Err(StorageError::InvalidId)));

        let id = Uuid::new_v4().to_string();
        assert!(storage.existing_result(&id).is_none());
        std::fs::create_dir_all(storage.results_dir()).unwrap();
        std::fs::write(storage.result_path(&id).unwrap(), b"png").unwrap();
        assert!(storage.existing_result(&id).is_some());
    }

    #[test]
    fn test_canonical_id() {
        let id = Uuid::new_v4();
        let simple = id.simple().to_string().to_uppercase();
        assert_eq!(Storage::canonical_id(&simple).unwrap(), id.to_string());
        assert_eq!(Storage::result_filename(&simple).unwrap(), format!("{id}.png"));
        assert!(matches!(Storage::canonical_id("nope"), Err(StorageError::InvalidId)));
    }
}
