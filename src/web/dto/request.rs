//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{empty_as_none, not_empty_trimmed};

/// User registration request.
///
/// Only shape is checked here; the username and password rules live in
/// `auth::validation`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Logout request.
#[derive(Debug, Deserialize, Validate)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Create folder request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    #[validate(
        length(min = 1, max = 255, message = "Folder name must be 1-255 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub name: String,
    /// Parent folder; omitted or null for the root.
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// File update request (PATCH /api/files/:id).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFileRequest {
    pub is_public: bool,
}

/// `?parent_id=` for folder listings.
#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<i64>,
}

/// `?folder_id=` for file listings.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub folder_id: Option<i64>,
}

/// `?q=` for file search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
