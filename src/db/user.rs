//! User model for filevault.
//!
//! Users own folders and files and carry their own storage quota.

use serde::Serialize;

/// Storage limit assigned to new accounts unless configured otherwise (10 MB).
pub const DEFAULT_STORAGE_LIMIT: i64 = 10 * 1024 * 1024;

/// User entity representing a registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Password hash (Argon2).
    pub password: String,
    /// Display name (optional).
    pub full_name: Option<String>,
    /// Bytes currently used by this user's files.
    pub storage_used: i64,
    /// Maximum number of bytes this user may store.
    pub storage_limit: i64,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// Current quota usage for this user.
    pub fn storage_usage(&self) -> StorageUsage {
        StorageUsage::new(self.storage_used, self.storage_limit)
    }

    /// Bytes still available before the quota is reached.
    pub fn remaining_storage(&self) -> i64 {
        (self.storage_limit - self.storage_used).max(0)
    }

    /// Whether an upload of `bytes` fits in the remaining quota.
    pub fn can_store(&self, bytes: i64) -> bool {
        bytes <= self.remaining_storage()
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// Display name (optional).
    pub full_name: Option<String>,
    /// Storage limit in bytes.
    pub storage_limit: i64,
}

impl NewUser {
    /// Create a new user with the default storage limit.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            full_name: None,
            storage_limit: DEFAULT_STORAGE_LIMIT,
        }
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the storage limit.
    pub fn with_storage_limit(mut self, limit: i64) -> Self {
        self.storage_limit = limit;
        self
    }
}

/// Snapshot of a user's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

impl StorageUsage {
    pub fn new(used: i64, limit: i64) -> Self {
        Self {
            used,
            limit,
            remaining: (limit - used).max(0),
        }
    }
}
