//! File management module for filevault.
//!
//! This module provides:
//! - Nested per-user folders
//! - File metadata with quota accounting
//! - On-disk blob storage with UUID naming
//! - The `FileService` that ties them to access rules

mod folder;
mod metadata;
mod service;
mod storage;

pub use folder::{Folder, FolderRepository, NewFolder};
pub use metadata::{
    file_type_from_name, format_bytes, is_previewable, FileMetadata, FileRepository, NewFile,
};
pub use service::{DownloadResult, FileService, UploadRequest};
pub use storage::FileStorage;

/// Maximum length for a filename (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length for a folder name (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 255;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
