//! Folder types and repository for filevault.

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::UserRepository;
use crate::{Result, VaultError};

const FOLDER_COLUMNS: &str = "id, name, user_id, parent_id, created_at, updated_at";

/// A folder in a user's file tree.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Owner.
    pub user_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// When the folder was created.
    pub created_at: String,
    /// When the folder was last modified.
    pub updated_at: String,
}

impl Folder {
    /// Check if this is a top-level folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Owner.
    pub user_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
}

impl NewFolder {
    /// Create a new top-level folder for a user.
    pub fn new(name: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            user_id,
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the parent folder from an optional ID.
    pub fn with_parent_opt(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    ///
    /// The owner and parent are checked by the insert itself, so a parent
    /// deleted concurrently can't end up with a dangling child.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query(
            "INSERT INTO folders (name, user_id, parent_id)
             SELECT ?, ?, ?
             WHERE EXISTS(SELECT 1 FROM users WHERE id = ?)
               AND (? IS NULL OR EXISTS(SELECT 1 FROM folders WHERE id = ?))",
        )
        .bind(&folder.name)
        .bind(folder.user_id)
        .bind(folder.parent_id)
        .bind(folder.user_id)
        .bind(folder.parent_id)
        .bind(folder.parent_id)
        .execute(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            let mut conn = self.pool.acquire().await?;
            let missing = if UserRepository::exists(&mut conn, folder.user_id).await? {
                "folder"
            } else {
                "user"
            };
            return Err(VaultError::NotFound(missing.to_string()));
        }

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List a user's folders, newest first.
    ///
    /// With `parent_id = None` every folder the user owns is returned;
    /// otherwise only the direct children of that parent.
    pub async fn list_by_user(&self, user_id: i64, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        let folders = match parent_id {
            None => {
                sqlx::query_as::<_, Folder>(&format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(self.pool)
                .await
            }
            Some(parent_id) => {
                sqlx::query_as::<_, Folder>(&format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? AND parent_id = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .bind(parent_id)
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Whether a folder row exists, on an existing connection or transaction.
    pub(crate) async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    /// Collect the IDs of a folder and all its descendants, deepest first.
    ///
    /// Returns an empty list when the folder doesn't exist.
    pub(crate) async fn subtree_ids(conn: &mut SqliteConnection, root_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "WITH RECURSIVE subtree(id, depth) AS (
                 SELECT id, 0 FROM folders WHERE id = ?
                 UNION ALL
                 SELECT f.id, s.depth + 1 FROM folders f JOIN subtree s ON f.parent_id = s.id
             )
             SELECT id FROM subtree ORDER BY depth DESC, id DESC",
        )
        .bind(root_id)
        .fetch_all(conn)
        .await?;

        Ok(ids)
    }

    /// Delete a single folder row on an existing connection or transaction.
    pub(crate) async fn delete_one(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users.create(&NewUser::new("alice", "pw")).await.unwrap();
        users.create(&NewUser::new("bob", "pw")).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(&NewFolder::new("Documents", 1)).await.unwrap();

        assert_eq!(folder.name, "Documents");
        assert_eq!(folder.user_id, 1);
        assert!(folder.is_root());
        assert_eq!(folder.created_at, folder.updated_at);
    }

    #[tokio::test]
    async fn test_list_by_user_filters_parent_and_owner() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let docs = repo.create(&NewFolder::new("Docs", 1)).await.unwrap();
        let work = repo
            .create(&NewFolder::new("Work", 1).with_parent(docs.id))
            .await
            .unwrap();
        repo.create(&NewFolder::new("Other", 2)).await.unwrap();

        let all = repo.list_by_user(1, None).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].id, work.id);
        assert_eq!(all[1].id, docs.id);

        let children = repo.list_by_user(1, Some(docs.id)).await.unwrap();
        assert_eq!(children, vec![work]);

        assert!(repo.list_by_user(2, Some(docs.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_owner_and_parent() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let result = repo.create(&NewFolder::new("orphan", 1).with_parent(42)).await;
        assert!(matches!(result, Err(VaultError::NotFound(what)) if what == "folder"));

        let result = repo.create(&NewFolder::new("nobody", 99)).await;
        assert!(matches!(result, Err(VaultError::NotFound(what)) if what == "user"));

        assert!(repo.list_by_user(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subtree_ids_deepest_first() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let a = repo.create(&NewFolder::new("a", 1)).await.unwrap();
        let b = repo
            .create(&NewFolder::new("b", 1).with_parent(a.id))
            .await
            .unwrap();
        let c = repo
            .create(&NewFolder::new("c", 1).with_parent(b.id))
            .await
            .unwrap();
        let sibling = repo.create(&NewFolder::new("s", 1)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let ids = FolderRepository::subtree_ids(&mut conn, a.id).await.unwrap();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
        assert!(!ids.contains(&sibling.id));

        assert!(FolderRepository::subtree_ids(&mut conn, 999)
            .await
            .unwrap()
            .is_empty());
    }
}
