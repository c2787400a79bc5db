//! Refresh token repository for JWT authentication.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{Result, VaultError};

const SQL_NOW: &str = "datetime('now')";

/// Refresh token entity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Token string.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

impl RefreshToken {
    /// Whether the token can still be exchanged, compared against `now`
    /// (database timestamp format).
    pub fn is_valid_at(&self, now: &str) -> bool {
        self.revoked_at.is_none() && self.expires_at.as_str() > now
    }
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token.
    pub async fn create(&self, user_id: i64, token: &str, expires_at: &str) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("refresh token".into()))
    }

    /// Get a refresh token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    /// Get a valid (not expired, not revoked) refresh token.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let sql = format!(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE token = ?
               AND revoked_at IS NULL
               AND expires_at > {SQL_NOW}"
        );
        let result = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;

        Ok(result)
    }

    /// Revoke a refresh token.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE refresh_tokens SET revoked_at = {SQL_NOW} WHERE token = ? AND revoked_at IS NULL"
        );
        let result = sqlx::query(&sql).bind(token).execute(self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired and revoked tokens (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!(
            "DELETE FROM refresh_tokens WHERE expires_at < {SQL_NOW} OR revoked_at IS NOT NULL"
        );
        let result = sqlx::query(&sql).execute(self.pool).await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(db.pool())
            .create(&NewUser::new("testuser", "hashedpassword"))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_refresh_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        let token = repo
            .create(1, "test-token-123", "2099-12-31 23:59:59")
            .await
            .unwrap();
        assert_eq!(token.user_id, 1);
        assert_eq!(token.token, "test-token-123");
        assert!(token.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_get_valid_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(1, "valid-token", "2099-12-31 23:59:59")
            .await
            .unwrap();
        repo.create(1, "expired-token", "2000-01-01 00:00:00")
            .await
            .unwrap();

        assert!(repo.get_valid_token("valid-token").await.unwrap().is_some());
        assert!(repo.get_valid_token("expired-token").await.unwrap().is_none());
        assert!(repo.get_valid_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(1, "revoke-me", "2099-12-31 23:59:59")
            .await
            .unwrap();

        assert!(repo.revoke("revoke-me").await.unwrap());
        assert!(repo.get_valid_token("revoke-me").await.unwrap().is_none());
        // Second revoke is a no-op
        assert!(!repo.revoke("revoke-me").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(1, "expired", "2000-01-01 00:00:00").await.unwrap();
        repo.create(1, "revoked", "2099-12-31 23:59:59").await.unwrap();
        repo.create(1, "valid", "2099-12-31 23:59:59").await.unwrap();
        repo.revoke("revoked").await.unwrap();

        let removed = repo.cleanup_expired().await.unwrap();
        assert_eq!(removed, 2);
        assert!(repo.get_valid_token("valid").await.unwrap().is_some());
    }

    #[test]
    fn test_is_valid_at() {
        let token = RefreshToken {
            id: 1,
            user_id: 1,
            token: "t".to_string(),
            expires_at: "2024-06-01 00:00:00".to_string(),
            created_at: "2024-05-01 00:00:00".to_string(),
            revoked_at: None,
        };
        assert!(token.is_valid_at("2024-05-15 12:00:00"));
        assert!(!token.is_valid_at("2024-06-01 00:00:01"));

        let revoked = RefreshToken {
            revoked_at: Some("2024-05-02 00:00:00".to_string()),
            ..token
        };
        assert!(!revoked.is_valid_at("2024-05-15 12:00:00"));
    }
}
