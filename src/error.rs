//! Error types for filevault.

use thiserror::Error;

/// Common error type for filevault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint violated (e.g. username taken).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload would exceed the user's storage quota.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Upload exceeds the per-file size limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Operation not supported for this resource (e.g. preview of a zip).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                VaultError::Conflict(db_err.message().to_string())
            }
            _ => VaultError::Database(e.to_string()),
        }
    }
}

/// Result type alias for filevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = VaultError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = VaultError::NotFound("folder".to_string());
        assert_eq!(err.to_string(), "folder not found");
    }

    #[test]
    fn test_quota_error_display() {
        let err = VaultError::QuotaExceeded("Not enough storage space".to_string());
        assert_eq!(err.to_string(), "quota exceeded: Not enough storage space");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing");
        let err: VaultError = io_err.into();
        assert!(matches!(err, VaultError::Io(_)));
        assert!(err.to_string().contains("blob missing"));
    }

    #[test]
    fn test_sqlx_row_not_found_is_database_error() {
        let err: VaultError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, VaultError::Database(_)));
    }
}
