//! User registration and login for filevault.

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{NewUser, User};
use crate::store::Storage;
use crate::VaultError;

/// Message returned for any failed login, so usernames can't be enumerated.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("username already exists")]
    UsernameExists,

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Storage(#[from] VaultError),
}

impl From<RegistrationError> for VaultError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Validation(v) => VaultError::Validation(v.to_string()),
            RegistrationError::UsernameExists => {
                VaultError::Conflict("username already exists".to_string())
            }
            RegistrationError::Password(PasswordError::HashError(msg)) => VaultError::Database(msg),
            RegistrationError::Password(p) => VaultError::Validation(p.to_string()),
            RegistrationError::Storage(inner) => inner,
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username (3-32 of letters, digits, `_`, `-`, `.`).
    pub username: String,
    /// Password (8-128 characters).
    pub password: String,
    /// Optional display name.
    pub full_name: Option<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            full_name: None,
        }
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// Register a new user.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks if the username already exists
/// 3. Hashes the password
/// 4. Creates the user with `storage_limit` bytes of quota
pub async fn register(
    storage: &dyn Storage,
    request: RegistrationRequest,
    storage_limit: i64,
) -> Result<User, RegistrationError> {
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    validate_registration(&request.username, &request.password, full_name)?;

    if storage
        .get_user_by_username(&request.username)
        .await?
        .is_some()
    {
        return Err(RegistrationError::UsernameExists);
    }

    let password_hash = hash_password(&request.password)?;

    let mut new_user =
        NewUser::new(&request.username, password_hash).with_storage_limit(storage_limit);
    if let Some(name) = full_name {
        new_user = new_user.with_full_name(name);
    }

    // A concurrent registration can still win the race; the backend reports it.
    let user = storage.create_user(new_user).await.map_err(|e| match e {
        VaultError::Conflict(_) => RegistrationError::UsernameExists,
        other => RegistrationError::Storage(other),
    })?;

    info!(
        username = %user.username,
        user_id = user.id,
        "New user registered"
    );

    Ok(user)
}

/// Check a username/password pair.
///
/// Returns `VaultError::Auth` with the same message whether the user is
/// missing or the password is wrong.
pub async fn authenticate(
    storage: &dyn Storage,
    username: &str,
    password: &str,
) -> crate::Result<User> {
    let Some(user) = storage.get_user_by_username(username).await? else {
        warn!(username = %username, "Login failed: unknown user");
        return Err(VaultError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    if verify_password(password, &user.password).is_err() {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(VaultError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DEFAULT_STORAGE_LIMIT};
    use crate::store::{DatabaseStorage, MemStorage};

    #[tokio::test]
    async fn test_register_success() {
        let storage = MemStorage::new();

        let request = RegistrationRequest::new("testuser", "password123").with_full_name("Test User");
        let user = register(&storage, request, DEFAULT_STORAGE_LIMIT).await.unwrap();

        assert_eq!(user.username, "testuser");
        assert_eq!(user.full_name.as_deref(), Some("Test User"));
        assert_eq!(user.storage_used, 0);
        assert_eq!(user.storage_limit, DEFAULT_STORAGE_LIMIT);
        assert_ne!(user.password, "password123");
    }

    #[tokio::test]
    async fn test_register_blank_full_name_is_none() {
        let storage = MemStorage::new();

        let request = RegistrationRequest::new("testuser", "password123").with_full_name("   ");
        let user = register(&storage, request, 100).await.unwrap();

        assert!(user.full_name.is_none());
        assert_eq!(user.storage_limit, 100);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let storage = DatabaseStorage::new(Database::open_in_memory().await.unwrap());

        register(&storage, RegistrationRequest::new("testuser", "password123"), 100)
            .await
            .unwrap();

        let result = register(&storage, RegistrationRequest::new("TESTUSER", "password456"), 100).await;
        assert!(matches!(result, Err(RegistrationError::UsernameExists)));

        let err: VaultError = result.unwrap_err().into();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_invalid_input() {
        let storage = MemStorage::new();

        let result = register(&storage, RegistrationRequest::new("ab", "password123"), 100).await;
        assert!(matches!(
            result,
            Err(RegistrationError::Validation(ValidationError::UsernameTooShort))
        ));

        let result = register(&storage, RegistrationRequest::new("alice", "short"), 100).await;
        let err: VaultError = result.unwrap_err().into();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let storage = MemStorage::new();
        register(&storage, RegistrationRequest::new("alice", "password123"), 100)
            .await
            .unwrap();

        let user = authenticate(&storage, "Alice", "password123").await.unwrap();
        assert_eq!(user.username, "alice");

        for (name, pw) in [("alice", "wrongpassword"), ("nobody", "password123")] {
            match authenticate(&storage, name, pw).await {
                Err(VaultError::Auth(msg)) => assert_eq!(msg, INVALID_CREDENTIALS),
                other => panic!("expected auth error, got {other:?}"),
            }
        }
    }
}
