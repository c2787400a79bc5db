//! API handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::file::{FileService, FileStorage};
use crate::store::Storage;

use super::middleware::JwtState;

pub mod auth;
pub mod file;
pub mod folder;
pub mod user;

pub use auth::*;
pub use file::*;
pub use folder::*;
pub use user::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Metadata backend (SQLite or in-memory).
    pub storage: Arc<dyn Storage>,
    /// Blob directory.
    pub blobs: Arc<FileStorage>,
    /// Access token keys.
    pub jwt: Arc<JwtState>,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry_days: u64,
    /// Largest accepted upload in bytes.
    pub max_upload_size: u64,
    /// Quota given to newly registered users.
    pub default_storage_limit: i64,
}

impl AppState {
    /// Create state with the default limits.
    pub fn new(storage: Arc<dyn Storage>, blobs: FileStorage, jwt_secret: &str) -> Self {
        Self {
            storage,
            blobs: Arc::new(blobs),
            jwt: Arc::new(JwtState::new(jwt_secret)),
            access_token_expiry: 900,
            refresh_token_expiry_days: 7,
            max_upload_size: crate::file::DEFAULT_MAX_FILE_SIZE,
            default_storage_limit: crate::db::DEFAULT_STORAGE_LIMIT,
        }
    }

    /// Create state from a loaded configuration.
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>, blobs: FileStorage) -> Self {
        Self::new(storage, blobs, &config.web.jwt_secret)
            .with_token_expiry(
                config.web.jwt_access_token_expiry_secs,
                config.web.jwt_refresh_token_expiry_days,
            )
            .with_max_upload_size(config.files.max_upload_size_bytes())
            .with_default_storage_limit(config.quota.default_limit_bytes)
    }

    pub fn with_token_expiry(mut self, access_secs: u64, refresh_days: u64) -> Self {
        self.access_token_expiry = access_secs;
        self.refresh_token_expiry_days = refresh_days;
        self
    }

    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn with_default_storage_limit(mut self, bytes: i64) -> Self {
        self.default_storage_limit = bytes;
        self
    }

    /// File service bound to this state's backends.
    pub fn file_service(&self) -> FileService<'_> {
        FileService::new(self.storage.as_ref(), &self.blobs).with_max_file_size(self.max_upload_size)
    }
}
