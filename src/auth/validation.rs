//! Input validation for filevault user registration.

use thiserror::Error;

use super::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Maximum full name length (characters).
pub const MAX_FULL_NAME_LENGTH: usize = 100;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    #[error("username can only contain letters, digits, '_', '-' and '.'")]
    UsernameInvalidChars,

    #[error("this username is reserved")]
    UsernameReserved,

    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    #[error("full name must be at most {MAX_FULL_NAME_LENGTH} characters")]
    FullNameTooLong,

    #[error("full name contains invalid characters")]
    FullNameInvalidChars,
}

/// Reserved usernames that cannot be registered.
const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "api",
    "support",
    "anonymous",
    "null",
    "undefined",
    "filevault",
];

/// Check if a username is reserved.
pub fn is_reserved_username(username: &str) -> bool {
    let lower = username.to_lowercase();
    RESERVED_USERNAMES.iter().any(|&r| r == lower)
}

/// Validate a username.
///
/// ```
/// use filevault::auth::validation::validate_username;
///
/// assert!(validate_username("john.doe").is_ok());
/// assert!(validate_username("ab").is_err());
/// assert!(validate_username("admin").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }

    if is_reserved_username(username) {
        return Err(ValidationError::UsernameReserved);
    }

    Ok(())
}

/// Validate a registration password (8-128 characters).
pub fn validate_registration_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Validate an optional display name.
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::FullNameTooLong);
    }
    if full_name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::FullNameInvalidChars);
    }
    Ok(())
}

/// Validate all registration fields at once.
///
/// Returns the first validation error encountered.
pub fn validate_registration(
    username: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_registration_password(password)?;
    if let Some(name) = full_name {
        validate_full_name(name)?;
    }
    Ok(())
}
