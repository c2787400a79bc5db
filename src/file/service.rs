//! File service for filevault.
//!
//! This module provides high-level file operations including:
//! - Upload with size, folder and quota checks
//! - Download and inline preview with access control
//! - Folder management with recursive deletion
//! - Search and storage usage

use std::collections::HashSet;

use tracing::{info, warn};

use crate::db::StorageUsage;
use crate::store::Storage;
use crate::{Result, VaultError};

use super::folder::{Folder, NewFolder};
use super::metadata::{FileMetadata, NewFile};
use super::storage::FileStorage;
use super::{DEFAULT_MAX_FILE_SIZE, MAX_FILENAME_LENGTH, MAX_FOLDER_NAME_LENGTH};

/// Request data for file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Folder to upload into (None for the root).
    pub folder_id: Option<i64>,
    /// Original filename.
    pub filename: String,
    /// MIME type reported by the client.
    pub mime_type: String,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request for the root folder.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            folder_id: None,
            filename: filename.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    /// Set the target folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub metadata: FileMetadata,
    /// File content.
    pub content: Vec<u8>,
}

/// Strip any directory part a browser may have sent with the filename.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

/// File service for managing uploads, downloads and folders.
pub struct FileService<'a> {
    storage: &'a dyn Storage,
    blobs: &'a FileStorage,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(storage: &'a dyn Storage, blobs: &'a FileStorage) -> Self {
        Self {
            storage,
            blobs,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Create a new FileService with a custom max file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Upload a file.
    ///
    /// Checks, in order: filename, per-file size limit, target folder
    /// ownership, remaining quota. The quota check here is a fast path; the
    /// storage backend re-checks it atomically when charging. The blob is
    /// written before the metadata and removed again if the insert fails.
    pub async fn upload(&self, user_id: i64, request: UploadRequest) -> Result<FileMetadata> {
        let filename = base_name(&request.filename).to_string();
        if filename.is_empty() {
            return Err(VaultError::Validation("File name is required".to_string()));
        }
        if filename.chars().count() > MAX_FILENAME_LENGTH {
            return Err(VaultError::Validation(format!(
                "File name must be at most {MAX_FILENAME_LENGTH} characters"
            )));
        }

        let size = request.content.len() as u64;
        if size > self.max_file_size {
            return Err(VaultError::PayloadTooLarge(format!(
                "File exceeds the maximum size of {}",
                super::format_bytes(self.max_file_size)
            )));
        }

        if let Some(folder_id) = request.folder_id {
            match self.storage.get_folder_by_id(folder_id).await? {
                Some(folder) if folder.user_id == user_id => {}
                _ => return Err(VaultError::Validation("Invalid folder".to_string())),
            }
        }

        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))?;
        if !user.can_store(size as i64) {
            return Err(VaultError::QuotaExceeded(
                "Not enough storage space".to_string(),
            ));
        }

        let key = self.blobs.save(user_id, &request.content, &filename)?;

        let new_file = NewFile::new(&filename, request.mime_type, size as i64, &key, user_id)
            .in_folder(request.folder_id);

        match self.storage.create_file(new_file).await {
            Ok(metadata) => {
                info!(
                    user_id,
                    file_id = metadata.id,
                    bytes = metadata.size,
                    "File uploaded"
                );
                Ok(metadata)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key) {
                    warn!(key = %key, "Failed to remove orphaned blob: {}", cleanup);
                }
                match e {
                    // Folder deleted after the ownership check
                    VaultError::NotFound(what) if what == "folder" => {
                        Err(VaultError::Validation("Invalid folder".to_string()))
                    }
                    e => Err(e),
                }
            }
        }
    }

    /// Get file metadata. The caller must own the file or it must be public.
    pub async fn get_file(&self, user_id: i64, file_id: i64) -> Result<FileMetadata> {
        let metadata = self
            .storage
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))?;

        if !metadata.can_read(user_id) {
            return Err(VaultError::Permission("Access denied".to_string()));
        }

        Ok(metadata)
    }

    /// Download a file's content.
    pub async fn download(&self, user_id: i64, file_id: i64) -> Result<DownloadResult> {
        let metadata = self.get_file(user_id, file_id).await?;

        let content = match self.blobs.load(&metadata.path) {
            Ok(content) => content,
            Err(VaultError::NotFound(_)) => {
                warn!(file_id, path = %metadata.path, "Blob missing for file");
                return Err(VaultError::NotFound("File not found on server".to_string()));
            }
            Err(e) => return Err(e),
        };

        Ok(DownloadResult { metadata, content })
    }

    /// Load a file for inline display. Only previewable types are served.
    pub async fn preview(&self, user_id: i64, file_id: i64) -> Result<DownloadResult> {
        let metadata = self.get_file(user_id, file_id).await?;
        if !metadata.is_previewable() {
            return Err(VaultError::Unsupported(format!(
                "Preview not available for {}",
                metadata.mime_type
            )));
        }
        self.download(user_id, file_id).await
    }

    /// Delete a file. Only the owner may delete.
    pub async fn delete_file(&self, user_id: i64, file_id: i64) -> Result<()> {
        let metadata = self
            .storage
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))?;

        if metadata.user_id != user_id {
            return Err(VaultError::Permission("Access denied".to_string()));
        }

        self.blobs.delete(&metadata.path)?;
        self.storage.delete_file(file_id).await?;

        info!(user_id, file_id, bytes = metadata.size, "File deleted");
        Ok(())
    }

    /// Toggle public visibility. Only the owner may change it.
    pub async fn set_visibility(
        &self,
        user_id: i64,
        file_id: i64,
        is_public: bool,
    ) -> Result<FileMetadata> {
        let metadata = self
            .storage
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))?;

        if metadata.user_id != user_id {
            return Err(VaultError::Permission("Access denied".to_string()));
        }

        self.storage
            .set_file_public(file_id, is_public)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    /// List the caller's files, optionally restricted to one folder.
    pub async fn list_files(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        if let Some(folder_id) = folder_id {
            self.get_folder(user_id, folder_id).await?;
        }
        self.storage.get_files_by_user_id(user_id, folder_id).await
    }

    /// Search the caller's files by name or type.
    pub async fn search(&self, user_id: i64, query: &str) -> Result<Vec<FileMetadata>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VaultError::Validation("Search query required".to_string()));
        }
        self.storage.search_files(user_id, query).await
    }

    /// Create a folder, optionally inside one of the caller's folders.
    pub async fn create_folder(
        &self,
        user_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::Validation("Folder name is required".to_string()));
        }
        if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
            return Err(VaultError::Validation(format!(
                "Folder name must be at most {MAX_FOLDER_NAME_LENGTH} characters"
            )));
        }
        if name.contains('/') || name.chars().any(char::is_control) {
            return Err(VaultError::Validation(
                "Folder name contains invalid characters".to_string(),
            ));
        }

        if let Some(parent_id) = parent_id {
            match self.storage.get_folder_by_id(parent_id).await? {
                Some(parent) if parent.user_id == user_id => {}
                _ => return Err(VaultError::Validation("Invalid parent folder".to_string())),
            }
        }

        let folder = self
            .storage
            .create_folder(NewFolder::new(name, user_id).with_parent_opt(parent_id))
            .await
            .map_err(|e| match e {
                VaultError::NotFound(what) if what == "folder" => {
                    VaultError::Validation("Invalid parent folder".to_string())
                }
                e => e,
            })?;

        info!(user_id, folder_id = folder.id, "Folder created");
        Ok(folder)
    }

    /// Get one of the caller's folders.
    pub async fn get_folder(&self, user_id: i64, folder_id: i64) -> Result<Folder> {
        let folder = self
            .storage
            .get_folder_by_id(folder_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("folder".to_string()))?;

        if folder.user_id != user_id {
            return Err(VaultError::Permission("Access denied".to_string()));
        }

        Ok(folder)
    }

    /// Folders from the root down to `folder_id`, for breadcrumbs.
    pub async fn folder_path(&self, user_id: i64, folder_id: i64) -> Result<Vec<Folder>> {
        let folder = self.get_folder(user_id, folder_id).await?;

        let mut seen = HashSet::from([folder.id]);
        let mut current = folder.parent_id;
        let mut path = vec![folder];

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            match self.storage.get_folder_by_id(parent_id).await? {
                Some(parent) => {
                    current = parent.parent_id;
                    path.push(parent);
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// List the caller's folders. `None` lists all of them.
    pub async fn list_folders(&self, user_id: i64, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        if let Some(parent_id) = parent_id {
            self.get_folder(user_id, parent_id).await?;
        }
        self.storage.get_folders_by_user_id(user_id, parent_id).await
    }

    /// Delete a folder with everything below it. Only the owner may delete.
    ///
    /// Returns the number of files removed.
    pub async fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<usize> {
        self.get_folder(user_id, folder_id).await?;

        let removed = self.storage.delete_folder(folder_id).await?;
        for file in &removed {
            if let Err(e) = self.blobs.delete(&file.path) {
                warn!(file_id = file.id, path = %file.path, "Failed to delete blob: {}", e);
            }
        }

        info!(user_id, folder_id, files = removed.len(), "Folder deleted");
        Ok(removed.len())
    }

    /// Quota usage for a user.
    pub async fn storage_usage(&self, user_id: i64) -> Result<StorageUsage> {
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))?;
        Ok(user.storage_usage())
    }
}
