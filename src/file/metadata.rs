//! File metadata types and repository for filevault.

use sqlx::{SqliteConnection, SqlitePool};

use super::folder::FolderRepository;
use crate::db::UserRepository;
use crate::{Result, VaultError};

const FILE_COLUMNS: &str = "id, name, file_type, mime_type, size, path, user_id, folder_id, \
                            is_public, created_at, updated_at";

/// MIME types the browser can render inline.
const PREVIEWABLE_MIME_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    // Documents
    "application/pdf",
    // Text
    "text/plain",
    "text/html",
    "text/css",
    "text/javascript",
    // Video
    "video/mp4",
    "video/webm",
    "video/ogg",
    // Audio
    "audio/mpeg",
    "audio/ogg",
    "audio/wav",
];

const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Metadata for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Original filename (display name).
    pub name: String,
    /// Lowercased extension, empty if none.
    pub file_type: String,
    /// MIME type reported at upload time.
    pub mime_type: String,
    /// File size in bytes.
    pub size: i64,
    /// Blob key in `FileStorage` (`{user_id}/{uuid}.{ext}`).
    pub path: String,
    /// Owner.
    pub user_id: i64,
    /// Folder ID (None for the root).
    pub folder_id: Option<i64>,
    /// Whether anyone may read the file.
    pub is_public: bool,
    /// When the file was uploaded.
    pub created_at: String,
    /// When the metadata was last changed.
    pub updated_at: String,
}

impl FileMetadata {
    /// Whether this file can be shown inline.
    pub fn is_previewable(&self) -> bool {
        is_previewable(&self.mime_type)
    }

    /// Whether `user_id` may read this file.
    pub fn can_read(&self, user_id: i64) -> bool {
        self.user_id == user_id || self.is_public
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub file_type: String,
    pub mime_type: String,
    pub size: i64,
    pub path: String,
    pub user_id: i64,
    pub folder_id: Option<i64>,
    pub is_public: bool,
}

impl NewFile {
    /// Create a new private file entry. `file_type` is derived from the name.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: i64,
        path: impl Into<String>,
        user_id: i64,
    ) -> Self {
        let name = name.into();
        Self {
            file_type: file_type_from_name(&name),
            name,
            mime_type: mime_type.into(),
            size,
            path: path.into(),
            user_id,
            folder_id: None,
            is_public: false,
        }
    }

    /// Place the file in a folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }

}

/// Lowercased text after the last `.` of a filename, or `""` if none.
pub fn file_type_from_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Check whether a MIME type can be previewed inline.
pub fn is_previewable(mime_type: &str) -> bool {
    PREVIEWABLE_MIME_TYPES.contains(&mime_type)
}

/// Human-readable size using binary units, e.g. `1536` -> `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file entry and charge its size to the owner's quota.
    ///
    /// The charge runs first and only succeeds if the size still fits, so
    /// concurrent uploads can't push usage past the limit. A missing owner
    /// or folder rolls the transaction back.
    pub async fn create(&self, file: &NewFile) -> Result<FileMetadata> {
        let mut tx = self.pool.begin().await?;

        if UserRepository::charge_storage(&mut *tx, file.user_id, file.size).await? == 0 {
            if UserRepository::exists(&mut *tx, file.user_id).await? {
                return Err(VaultError::QuotaExceeded(
                    "Not enough storage space".to_string(),
                ));
            }
            return Err(VaultError::NotFound("user".to_string()));
        }

        if let Some(folder_id) = file.folder_id {
            if !FolderRepository::exists(&mut *tx, folder_id).await? {
                return Err(VaultError::NotFound("folder".to_string()));
            }
        }

        let result = sqlx::query(
            "INSERT INTO files (name, file_type, mime_type, size, path, user_id, folder_id, is_public)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.name)
        .bind(&file.file_type)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(&file.path)
        .bind(file.user_id)
        .bind(file.folder_id)
        .bind(file.is_public)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Get a file by its blob key.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE path = ?"
        ))
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List a user's files, newest first.
    ///
    /// With `folder_id = None` every file the user owns is returned.
    pub async fn list_by_user(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        let files = match folder_id {
            None => {
                sqlx::query_as::<_, FileMetadata>(&format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE user_id = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(self.pool)
                .await?
            }
            Some(folder_id) => {
                sqlx::query_as::<_, FileMetadata>(&format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE user_id = ? AND folder_id = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .bind(folder_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(files)
    }

    /// List files in a folder (ordered by created_at descending).
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Case-insensitive substring search over name and file type.
    pub async fn search(&self, user_id: i64, query: &str) -> Result<Vec<FileMetadata>> {
        let pattern = like_pattern(query);
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ?
               AND (name LIKE ? ESCAPE '\\' OR file_type LIKE ? ESCAPE '\\')
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Toggle public visibility. Returns None if the file doesn't exist.
    pub async fn set_public(&self, id: i64, is_public: bool) -> Result<Option<FileMetadata>> {
        let result =
            sqlx::query("UPDATE files SET is_public = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(is_public)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete a file and release its size from the owner's quota.
    ///
    /// Returns the removed entry, or None if it didn't exist.
    pub async fn delete(&self, id: i64) -> Result<Option<FileMetadata>> {
        let mut tx = self.pool.begin().await?;

        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(file) = file else {
            return Ok(None);
        };

        Self::delete_one(&mut *tx, file.id).await?;
        UserRepository::adjust_storage(&mut *tx, file.user_id, -file.size).await?;
        tx.commit().await?;

        Ok(Some(file))
    }

    /// List files inside any of the given folders, on an existing transaction.
    pub(crate) async fn list_in_folders(
        conn: &mut SqliteConnection,
        folder_ids: &[i64],
    ) -> Result<Vec<FileMetadata>> {
        if folder_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id IN ("
        ));
        let mut separated = query.separated(", ");
        for id in folder_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY created_at DESC, id DESC");

        let files = query
            .build_query_as::<FileMetadata>()
            .fetch_all(conn)
            .await?;
        Ok(files)
    }

    /// Delete a single file row on an existing connection or transaction.
    pub(crate) async fn delete_one(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
