//! Metadata storage abstraction for filevault.
//!
//! Every read and write of users, folders, files and refresh tokens goes
//! through the [`Storage`] trait. Two backends implement it:
//! - [`MemStorage`]: process-local maps, used for demos and tests
//! - [`DatabaseStorage`]: SQLite through sqlx
//!
//! Both backends keep each user's `storage_used` equal to the total size of
//! their files, as long as files are created and deleted through the trait.

mod database;
mod memory;

pub use database::DatabaseStorage;
pub use memory::MemStorage;

use async_trait::async_trait;

use crate::db::{NewUser, RefreshToken, User};
use crate::file::{FileMetadata, Folder, NewFile, NewFolder};
use crate::Result;

/// Storage backend for users, the folder tree, file metadata and sessions.
#[async_trait]
pub trait Storage: Send + Sync {
    // Users

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Look a user up by name, ignoring ASCII case.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Create a user with zero usage. A taken username is a `Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Add `delta` bytes (may be negative) to the user's usage, clamped at 0.
    async fn update_user_storage(&self, user_id: i64, delta: i64) -> Result<User>;

    // Folders

    async fn create_folder(&self, folder: NewFolder) -> Result<Folder>;

    /// List a user's folders, newest first.
    ///
    /// `None` returns every folder the user owns; `Some(p)` only the direct
    /// children of `p`.
    async fn get_folders_by_user_id(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<Folder>>;

    async fn get_folder_by_id(&self, id: i64) -> Result<Option<Folder>>;

    /// Delete a folder with all of its descendants and their files.
    ///
    /// Each removed file is released from its owner's quota. Returns the
    /// removed file records so their blobs can be deleted.
    async fn delete_folder(&self, id: i64) -> Result<Vec<FileMetadata>>;

    // Files

    /// Insert file metadata and charge its size to the owner's quota.
    async fn create_file(&self, file: NewFile) -> Result<FileMetadata>;

    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileMetadata>>;

    /// List a user's files, newest first. `None` returns all of them.
    async fn get_files_by_user_id(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>>;

    async fn get_files_by_folder_id(&self, folder_id: i64) -> Result<Vec<FileMetadata>>;

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileMetadata>>;

    /// Remove file metadata and release its size from the owner's quota.
    async fn delete_file(&self, id: i64) -> Result<Option<FileMetadata>>;

    /// Case-insensitive substring match on name or file type.
    async fn search_files(&self, user_id: i64, query: &str) -> Result<Vec<FileMetadata>>;

    async fn set_file_public(&self, id: i64, is_public: bool) -> Result<Option<FileMetadata>>;

    // Sessions

    async fn create_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<RefreshToken>;

    /// Get an unrevoked, unexpired refresh token.
    async fn get_valid_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>>;

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool>;

    /// Delete expired and revoked tokens.
    async fn cleanup_refresh_tokens(&self) -> Result<u64>;
}
