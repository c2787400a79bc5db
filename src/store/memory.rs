//! In-memory [`Storage`] implementation.
//!
//! All state sits in one set of maps behind a single mutex. The lock is
//! never held across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::Storage;
use crate::datetime::now_string;
use crate::db::{NewUser, RefreshToken, User};
use crate::file::{FileMetadata, Folder, NewFile, NewFolder};
use crate::{Result, VaultError};

#[derive(Debug)]
struct Inner {
    users: HashMap<i64, User>,
    folders: HashMap<i64, Folder>,
    files: HashMap<i64, FileMetadata>,
    tokens: HashMap<i64, RefreshToken>,
    next_user_id: i64,
    next_folder_id: i64,
    next_file_id: i64,
    next_token_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            folders: HashMap::new(),
            files: HashMap::new(),
            tokens: HashMap::new(),
            next_user_id: 1,
            next_folder_id: 1,
            next_file_id: 1,
            next_token_id: 1,
        }
    }
}

impl Inner {
    fn adjust_storage(&mut self, user_id: i64, delta: i64) -> Option<&User> {
        let user = self.users.get_mut(&user_id)?;
        user.storage_used = user.storage_used.saturating_add(delta).max(0);
        Some(user)
    }

    /// Remove a file record and release its bytes.
    fn remove_file(&mut self, id: i64) -> Option<FileMetadata> {
        let file = self.files.remove(&id)?;
        self.adjust_storage(file.user_id, -file.size);
        Some(file)
    }
}

/// Newest first, ties broken by the higher id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (&str, i64)) {
    items.sort_by(|a, b| {
        let (a_time, a_id) = key(a);
        let (b_time, b_id) = key(b);
        b_time.cmp(a_time).then(b_id.cmp(&a_id))
    });
}

fn sort_files(mut files: Vec<FileMetadata>) -> Vec<FileMetadata> {
    newest_first(&mut files, |f| (f.created_at.as_str(), f.id));
    files
}

fn sort_folders(mut folders: Vec<Folder>) -> Vec<Folder> {
    newest_first(&mut folders, |f| (f.created_at.as_str(), f.id));
    folders
}

/// Storage that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemStorage {
    inner: Mutex<Inner>,
}

impl MemStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| VaultError::Database("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.lock()?;

        if inner
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(VaultError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }

        let id = inner.next_user_id;
        inner.next_user_id += 1;

        let created = User {
            id,
            username: user.username,
            password: user.password,
            full_name: user.full_name,
            storage_used: 0,
            storage_limit: user.storage_limit,
            created_at: now_string(),
        };
        inner.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_user_storage(&self, user_id: i64, delta: i64) -> Result<User> {
        let mut inner = self.lock()?;
        inner
            .adjust_storage(user_id, delta)
            .cloned()
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    async fn create_folder(&self, folder: NewFolder) -> Result<Folder> {
        let mut inner = self.lock()?;

        if !inner.users.contains_key(&folder.user_id) {
            return Err(VaultError::NotFound("user".to_string()));
        }
        if let Some(parent_id) = folder.parent_id {
            if !inner.folders.contains_key(&parent_id) {
                return Err(VaultError::NotFound("folder".to_string()));
            }
        }

        let id = inner.next_folder_id;
        inner.next_folder_id += 1;

        let now = now_string();
        let created = Folder {
            id,
            name: folder.name,
            user_id: folder.user_id,
            parent_id: folder.parent_id,
            created_at: now.clone(),
            updated_at: now,
        };
        inner.folders.insert(id, created.clone());
        Ok(created)
    }

    async fn get_folders_by_user_id(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<Folder>> {
        let inner = self.lock()?;
        let folders = inner
            .folders
            .values()
            .filter(|f| f.user_id == user_id)
            .filter(|f| parent_id.is_none() || f.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(sort_folders(folders))
    }

    async fn get_folder_by_id(&self, id: i64) -> Result<Option<Folder>> {
        Ok(self.lock()?.folders.get(&id).cloned())
    }

    async fn delete_folder(&self, id: i64) -> Result<Vec<FileMetadata>> {
        let mut inner = self.lock()?;

        if !inner.folders.contains_key(&id) {
            return Ok(Vec::new());
        }

        // Breadth-first walk of the subtree
        let mut subtree = vec![id];
        let mut cursor = 0;
        while cursor < subtree.len() {
            let parent = subtree[cursor];
            let mut children: Vec<i64> = inner
                .folders
                .values()
                .filter(|f| f.parent_id == Some(parent))
                .map(|f| f.id)
                .collect();
            children.sort_unstable();
            subtree.extend(children);
            cursor += 1;
        }
        let members: HashSet<i64> = subtree.iter().copied().collect();

        let file_ids: Vec<i64> = inner
            .files
            .values()
            .filter(|f| f.folder_id.is_some_and(|fid| members.contains(&fid)))
            .map(|f| f.id)
            .collect();

        let removed: Vec<FileMetadata> = file_ids
            .into_iter()
            .filter_map(|file_id| inner.remove_file(file_id))
            .collect();

        for folder_id in subtree.iter().rev() {
            inner.folders.remove(folder_id);
        }

        Ok(sort_files(removed))
    }

    async fn create_file(&self, file: NewFile) -> Result<FileMetadata> {
        let mut inner = self.lock()?;

        let owner = inner
            .users
            .get(&file.user_id)
            .ok_or_else(|| VaultError::NotFound("user".to_string()))?;
        if !owner.can_store(file.size) {
            return Err(VaultError::QuotaExceeded(
                "Not enough storage space".to_string(),
            ));
        }
        if let Some(folder_id) = file.folder_id {
            if !inner.folders.contains_key(&folder_id) {
                return Err(VaultError::NotFound("folder".to_string()));
            }
        }
        if inner.files.values().any(|f| f.path == file.path) {
            return Err(VaultError::Conflict(format!("path '{}' exists", file.path)));
        }

        let id = inner.next_file_id;
        inner.next_file_id += 1;

        let now = now_string();
        let created = FileMetadata {
            id,
            name: file.name,
            file_type: file.file_type,
            mime_type: file.mime_type,
            size: file.size,
            path: file.path,
            user_id: file.user_id,
            folder_id: file.folder_id,
            is_public: file.is_public,
            created_at: now.clone(),
            updated_at: now,
        };
        inner.files.insert(id, created.clone());
        inner.adjust_storage(created.user_id, created.size);
        Ok(created)
    }

    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        Ok(self.lock()?.files.get(&id).cloned())
    }

    async fn get_files_by_user_id(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        let inner = self.lock()?;
        let files = inner
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .filter(|f| folder_id.is_none() || f.folder_id == folder_id)
            .cloned()
            .collect();
        Ok(sort_files(files))
    }

    async fn get_files_by_folder_id(&self, folder_id: i64) -> Result<Vec<FileMetadata>> {
        let inner = self.lock()?;
        let files = inner
            .files
            .values()
            .filter(|f| f.folder_id == Some(folder_id))
            .cloned()
            .collect();
        Ok(sort_files(files))
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileMetadata>> {
        let inner = self.lock()?;
        Ok(inner.files.values().find(|f| f.path == path).cloned())
    }

    async fn delete_file(&self, id: i64) -> Result<Option<FileMetadata>> {
        Ok(self.lock()?.remove_file(id))
    }

    async fn search_files(&self, user_id: i64, query: &str) -> Result<Vec<FileMetadata>> {
        let needle = query.to_lowercase();
        let inner = self.lock()?;
        let files = inner
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .filter(|f| {
                f.name.to_lowercase().contains(&needle)
                    || f.file_type.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(sort_files(files))
    }

    async fn set_file_public(&self, id: i64, is_public: bool) -> Result<Option<FileMetadata>> {
        let mut inner = self.lock()?;
        Ok(inner.files.get_mut(&id).map(|file| {
            file.is_public = is_public;
            file.updated_at = now_string();
            file.clone()
        }))
    }

    async fn create_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<RefreshToken> {
        let mut inner = self.lock()?;

        if inner.tokens.values().any(|t| t.token == token) {
            return Err(VaultError::Conflict("refresh token exists".to_string()));
        }

        let id = inner.next_token_id;
        inner.next_token_id += 1;

        let created = RefreshToken {
            id,
            user_id,
            token: token.to_string(),
            expires_at: expires_at.to_string(),
            created_at: now_string(),
            revoked_at: None,
        };
        inner.tokens.insert(id, created.clone());
        Ok(created)
    }

    async fn get_valid_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let now = now_string();
        let inner = self.lock()?;
        Ok(inner
            .tokens
            .values()
            .find(|t| t.token == token && t.is_valid_at(&now))
            .cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool> {
        let now = now_string();
        let mut inner = self.lock()?;
        match inner
            .tokens
            .values_mut()
            .find(|t| t.token == token && t.revoked_at.is_none())
        {
            Some(t) => {
                t.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cleanup_refresh_tokens(&self) -> Result<u64> {
        let now = now_string();
        let mut inner = self.lock()?;
        let before = inner.tokens.len();
        inner
            .tokens
            .retain(|_, t| t.revoked_at.is_none() && t.expires_at.as_str() >= now.as_str());
        Ok((before - inner.tokens.len()) as u64)
    }
}
