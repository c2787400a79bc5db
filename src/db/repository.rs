//! User repository for filevault.
//!
//! This module provides CRUD operations and quota accounting for users.

use sqlx::{SqliteConnection, SqlitePool};

use super::user::{NewUser, User};
use crate::{Result, VaultError};

const USER_COLUMNS: &str =
    "id, username, password, full_name, storage_used, storage_limit, created_at";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID. A taken username
    /// (compared case-insensitively) yields `VaultError::Conflict`.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, full_name, storage_used, storage_limit)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.full_name)
        .bind(new_user.storage_limit)
        .execute(self.pool)
        .await
        .map_err(|e| match VaultError::from(e) {
            VaultError::Conflict(_) => {
                VaultError::Conflict(format!("username '{}' is taken", new_user.username))
            }
            other => other,
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Add `delta` bytes (possibly negative) to a user's storage usage.
    ///
    /// Returns the updated user, or `NotFound` if the user doesn't exist.
    pub async fn update_storage(&self, id: i64, delta: i64) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        if Self::adjust_storage(&mut conn, id, delta).await? == 0 {
            return Err(VaultError::NotFound("user".to_string()));
        }
        drop(conn);

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    /// Apply a storage delta on an existing connection or transaction.
    ///
    /// Usage never drops below zero. Returns the number of rows touched.
    pub(crate) async fn adjust_storage(
        conn: &mut SqliteConnection,
        id: i64,
        delta: i64,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE users SET storage_used = MAX(0, storage_used + ?) WHERE id = ?")
                .bind(delta)
                .bind(id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Charge `bytes` to a user only if they fit in the remaining quota.
    ///
    /// The check and the write are one statement. Returns the number of rows
    /// touched: 0 means the user is missing or the quota is exhausted.
    pub(crate) async fn charge_storage(
        conn: &mut SqliteConnection,
        id: i64,
        bytes: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE users SET storage_used = storage_used + ?
             WHERE id = ? AND storage_used + ? <= storage_limit",
        )
        .bind(bytes)
        .bind(id)
        .bind(bytes)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether a user row exists, on an existing connection or transaction.
    pub(crate) async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let new_user = NewUser::new("testuser", "hashedpw").with_full_name("Test User");
        let user = repo.create(&new_user).await.unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.full_name.as_deref(), Some("Test User"));
        assert_eq!(user.storage_used, 0);
        assert_eq!(user.storage_limit, 10_485_760);
    }

    #[tokio::test]
    async fn test_create_duplicate_username_is_conflict() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("testuser", "hashedpw")).await.unwrap();

        let result = repo.create(&NewUser::new("TestUser", "otherpw")).await;
        assert!(matches!(result, Err(VaultError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let created = repo.create(&NewUser::new("testuser", "hashedpw")).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(found.unwrap().username, "testuser");

        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_username_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("Alice", "hashedpw")).await.unwrap();

        assert!(repo.get_by_username("alice").await.unwrap().is_some());
        assert!(repo.get_by_username("ALICE").await.unwrap().is_some());
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_storage() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo.create(&NewUser::new("testuser", "hashedpw")).await.unwrap();

        let user = repo.update_storage(user.id, 500).await.unwrap();
        assert_eq!(user.storage_used, 500);

        let user = repo.update_storage(user.id, -200).await.unwrap();
        assert_eq!(user.storage_used, 300);
    }

    #[tokio::test]
    async fn test_update_storage_clamps_at_zero() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo.create(&NewUser::new("testuser", "hashedpw")).await.unwrap();
        let user = repo.update_storage(user.id, -100).await.unwrap();
        assert_eq!(user.storage_used, 0);
    }

    #[tokio::test]
    async fn test_update_storage_missing_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = repo.update_storage(42, 10).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_charge_storage_respects_limit() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("testuser", "hashedpw").with_storage_limit(10))
            .await
            .unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(UserRepository::charge_storage(&mut conn, user.id, 6).await.unwrap(), 1);
        assert_eq!(UserRepository::charge_storage(&mut conn, user.id, 6).await.unwrap(), 0);
        assert_eq!(UserRepository::charge_storage(&mut conn, user.id, 4).await.unwrap(), 1);
        assert_eq!(UserRepository::charge_storage(&mut conn, 99, 1).await.unwrap(), 0);
        drop(conn);

        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.storage_used, 10);
    }
}
