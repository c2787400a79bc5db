//! Configuration module for filevault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VaultError};

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Whether to serve the built client from `static_path`.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Rate limit for login endpoint (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    5000
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    7
}

fn default_static_path() -> String {
    "client/dist".to_string()
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            serve_static: false,
            static_path: default_static_path(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Metadata backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database via sqlx.
    Sqlite,
    /// Process-local maps; everything is lost on restart.
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Which metadata backend to use.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_db_path() -> String {
    "data/filevault.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
        }
    }
}

/// Uploaded file storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory that holds uploaded blobs.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum size of a single upload in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Per-user quota configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Storage limit assigned to newly registered users, in bytes.
    #[serde(default = "default_storage_limit")]
    pub default_limit_bytes: i64,
}

fn default_storage_limit() -> i64 {
    crate::db::DEFAULT_STORAGE_LIMIT
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_limit_bytes: default_storage_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filevault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Uploaded file storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Quota configuration.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEVAULT_JWT_SECRET`: JWT secret key
    /// - `FILEVAULT_DATABASE_PATH`: SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("FILEVAULT_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }
        if let Ok(db_path) = std::env::var("FILEVAULT_DATABASE_PATH") {
            if !db_path.is_empty() {
                self.database.path = db_path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(VaultError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILEVAULT_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.files.max_upload_size_mb == 0 {
            return Err(VaultError::Config(
                "files.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.quota.default_limit_bytes <= 0 {
            return Err(VaultError::Config(
                "quota.default_limit_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
