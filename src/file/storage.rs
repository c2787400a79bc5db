//! Blob storage for filevault.
//!
//! Uploaded bytes live on disk, one directory per user:
//! ```text
//! {base_path}/
//! ├── 1/
//! │   ├── ab12cd34-5678-90ab-cdef-123456789012.pdf
//! │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! └── 2/
//!     └── ...
//! ```
//! The key stored in `FileMetadata.path` is the part below `base_path`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::{Result, VaultError};

/// File storage service for managing physical files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content for a user under a new UUID-based name.
    ///
    /// Returns the storage key (`{user_id}/{uuid}.{ext}`).
    pub fn save(&self, user_id: i64, content: &[u8], original_name: &str) -> Result<String> {
        let key = Self::generate_key(user_id, original_name);
        let file_path = self.file_path(&key)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, content)?;

        Ok(key)
    }

    /// Load a file's content by key.
    pub fn load(&self, key: &str) -> Result<Vec<u8>> {
        let file_path = self.file_path(key)?;

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("blob {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file from storage.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let file_path = self.file_path(key)?;

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in storage.
    pub fn exists(&self, key: &str) -> bool {
        self.file_path(key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Resolve a key to its on-disk path.
    ///
    /// Keys must be relative and may not climb out of the base directory.
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            return Err(VaultError::Validation(format!("invalid storage key: {key}")));
        }

        Ok(self.base_path.join(relative))
    }

    /// Generate a new storage key for a user's upload.
    ///
    /// The extension is taken from the original name, or "bin" if it has none.
    pub fn generate_key(user_id: i64, original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{user_id}/{uuid}.{ext}")
    }

    /// Extract a safe, lowercased file extension.
    fn extract_extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }
}
