//! SQLite-backed [`Storage`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::Storage;
use crate::db::{Database, NewUser, RefreshToken, RefreshTokenRepository, User, UserRepository};
use crate::file::{FileMetadata, FileRepository, Folder, FolderRepository, NewFile, NewFolder};
use crate::Result;

/// Storage backed by the SQLite database.
#[derive(Debug, Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    /// Wrap an opened (and migrated) database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.db.pool())
    }

    fn folders(&self) -> FolderRepository<'_> {
        FolderRepository::new(self.db.pool())
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    fn tokens(&self) -> RefreshTokenRepository<'_> {
        RefreshTokenRepository::new(self.db.pool())
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.users().get_by_id(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.users().get_by_username(username).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.users().create(&user).await
    }

    async fn update_user_storage(&self, user_id: i64, delta: i64) -> Result<User> {
        self.users().update_storage(user_id, delta).await
    }

    async fn create_folder(&self, folder: NewFolder) -> Result<Folder> {
        self.folders().create(&folder).await
    }

    async fn get_folders_by_user_id(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<Folder>> {
        self.folders().list_by_user(user_id, parent_id).await
    }

    async fn get_folder_by_id(&self, id: i64) -> Result<Option<Folder>> {
        self.folders().get_by_id(id).await
    }

    async fn delete_folder(&self, id: i64) -> Result<Vec<FileMetadata>> {
        let mut tx = self.db.pool().begin().await?;

        let folder_ids = FolderRepository::subtree_ids(&mut *tx, id).await?;
        if folder_ids.is_empty() {
            return Ok(Vec::new());
        }

        let files = FileRepository::list_in_folders(&mut *tx, &folder_ids).await?;

        let mut released: HashMap<i64, i64> = HashMap::new();
        for file in &files {
            FileRepository::delete_one(&mut *tx, file.id).await?;
            *released.entry(file.user_id).or_default() += file.size;
        }
        for (user_id, bytes) in released {
            UserRepository::adjust_storage(&mut *tx, user_id, -bytes).await?;
        }

        // Deepest first so no row ever points at a deleted parent
        for folder_id in &folder_ids {
            FolderRepository::delete_one(&mut *tx, *folder_id).await?;
        }

        tx.commit().await?;

        debug!(
            folder_id = id,
            folders = folder_ids.len(),
            files = files.len(),
            "Deleted folder subtree"
        );
        Ok(files)
    }

    async fn create_file(&self, file: NewFile) -> Result<FileMetadata> {
        self.files().create(&file).await
    }

    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        self.files().get_by_id(id).await
    }

    async fn get_files_by_user_id(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        self.files().list_by_user(user_id, folder_id).await
    }

    async fn get_files_by_folder_id(&self, folder_id: i64) -> Result<Vec<FileMetadata>> {
        self.files().list_by_folder(folder_id).await
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileMetadata>> {
        self.files().get_by_path(path).await
    }

    async fn delete_file(&self, id: i64) -> Result<Option<FileMetadata>> {
        self.files().delete(id).await
    }

    async fn search_files(&self, user_id: i64, query: &str) -> Result<Vec<FileMetadata>> {
        self.files().search(user_id, query).await
    }

    async fn set_file_public(&self, id: i64, is_public: bool) -> Result<Option<FileMetadata>> {
        self.files().set_public(id, is_public).await
    }

    async fn create_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<RefreshToken> {
        self.tokens().create(user_id, token, expires_at).await
    }

    async fn get_valid_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        self.tokens().get_valid_token(token).await
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool> {
        self.tokens().revoke(token).await
    }

    async fn cleanup_refresh_tokens(&self) -> Result<u64> {
        self.tokens().cleanup_expired().await
    }
}
