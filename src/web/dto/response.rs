//! Response DTOs for Web API.

use serde::Serialize;

use crate::datetime::to_rfc3339;
use crate::db::{StorageUsage, User};
use crate::file::{format_bytes, FileMetadata, Folder};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Quota figures, with human-readable forms for display.
#[derive(Debug, Serialize)]
pub struct StorageResponse {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    pub used_display: String,
    pub limit_display: String,
}

impl From<StorageUsage> for StorageResponse {
    fn from(usage: StorageUsage) -> Self {
        Self {
            used: usage.used,
            limit: usage.limit,
            remaining: usage.remaining,
            used_display: format_bytes(usage.used.max(0) as u64),
            limit_display: format_bytes(usage.limit.max(0) as u64),
        }
    }
}

/// User information in responses. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub storage_used: i64,
    pub storage_limit: i64,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            storage_used: user.storage_used,
            storage_limit: user.storage_limit,
            created_at: to_rfc3339(&user.created_at),
        }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Token refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Current user response (for /api/auth/me).
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub storage: StorageResponse,
}

/// Folder response.
#[derive(Debug, Serialize)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
        }
    }
}

/// File metadata response.
///
/// The on-disk blob key is internal and never exposed.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    pub file_type: String,
    pub mime_type: String,
    pub size: i64,
    pub size_display: String,
    pub folder_id: Option<i64>,
    pub is_public: bool,
    pub is_previewable: bool,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FileMetadata> for FileResponse {
    fn from(file: FileMetadata) -> Self {
        Self {
            is_previewable: file.is_previewable(),
            size_display: format_bytes(file.size.max(0) as u64),
            id: file.id,
            name: file.name,
            file_type: file.file_type,
            mime_type: file.mime_type,
            size: file.size,
            folder_id: file.folder_id,
            is_public: file.is_public,
            owner_id: file.user_id,
            created_at: to_rfc3339(&file.created_at),
            updated_at: to_rfc3339(&file.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_response() {
        let resp = StorageResponse::from(StorageUsage::new(1536, 10 * 1024 * 1024));
        assert_eq!(resp.remaining, 10 * 1024 * 1024 - 1536);
        assert_eq!(resp.used_display, "1.5 KB");
        assert_eq!(resp.limit_display, "10 MB");
    }

    #[test]
    fn test_file_response_hides_path() {
        let file = FileMetadata {
            id: 3,
            name: "photo.JPG".to_string(),
            file_type: "jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 2048,
            path: "1/abc.jpg".to_string(),
            user_id: 1,
            folder_id: None,
            is_public: false,
            created_at: "2024-01-15 10:30:00".to_string(),
            updated_at: "2024-01-15 10:30:00".to_string(),
        };

        let json = serde_json::to_value(FileResponse::from(file)).unwrap();
        assert!(json.get("path").is_none());
        assert_eq!(json["owner_id"], 1);
        assert_eq!(json["is_previewable"], true);
        assert_eq!(json["size_display"], "2 KB");
        assert_eq!(json["created_at"], "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_api_response_wraps_data() {
        let json = serde_json::to_value(ApiResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"data": [1, 2]}));
    }
}
