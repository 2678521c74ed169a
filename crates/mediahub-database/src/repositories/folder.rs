//! Folder repository implementation.

use sqlx::{PgConnection, PgPool};

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, UserId};
use mediahub_entity::folder::Folder;

const ORDER: &str = "ORDER BY depth ASC, sort_order ASC, lower(name) ASC";

/// Repository for folder reads and transactional writes.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Find several folders by ID.
    pub async fn find_by_ids(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!("SELECT * FROM folders WHERE id = ANY($1) {ORDER}"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folders", e))
    }

    /// List every folder.
    pub async fn find_all(&self) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!("SELECT * FROM folders {ORDER}"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    /// List root folders owned by a user.
    pub async fn find_roots(&self, owner_id: UserId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT * FROM folders WHERE owner_id = $1 AND parent_id IS NULL {ORDER}"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list root folders", e))
    }

    /// List direct children of a folder.
    pub async fn find_children(&self, parent_id: FolderId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT * FROM folders WHERE parent_id = $1 {ORDER}"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// List a folder and every descendant, using the materialized path.
    pub async fn find_subtree(&self, root_id: FolderId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "WITH anchor AS (SELECT path FROM folders WHERE id = $1) \
             SELECT f.* FROM folders f, anchor a \
             WHERE f.path = a.path OR f.path LIKE a.path || '/%' {ORDER}"
        ))
        .bind(root_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subtree", e))
    }

    /// List every folder in trees whose root the user owns.
    pub async fn find_library(&self, owner_id: UserId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "WITH roots AS ( \
                SELECT path FROM folders WHERE owner_id = $1 AND parent_id IS NULL \
             ) \
             SELECT f.* FROM folders f \
             WHERE EXISTS ( \
                SELECT 1 FROM roots r WHERE f.path = r.path OR f.path LIKE r.path || '/%' \
             ) {ORDER}"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list library", e))
    }

    /// Insert or replace a folder inside a transaction.
    pub async fn upsert(conn: &mut PgConnection, folder: &Folder) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO folders (id, owner_id, parent_id, name, path, depth, sort_order, \
                color, icon, description, visibility, file_count, total_size, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (id) DO UPDATE SET \
                parent_id = EXCLUDED.parent_id, name = EXCLUDED.name, path = EXCLUDED.path, \
                depth = EXCLUDED.depth, sort_order = EXCLUDED.sort_order, color = EXCLUDED.color, \
                icon = EXCLUDED.icon, description = EXCLUDED.description, \
                visibility = EXCLUDED.visibility, file_count = EXCLUDED.file_count, \
                total_size = EXCLUDED.total_size, updated_at = EXCLUDED.updated_at",
        )
        .bind(folder.id)
        .bind(folder.owner_id)
        .bind(folder.parent_id)
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(folder.depth)
        .bind(folder.sort_order)
        .bind(&folder.color)
        .bind(&folder.icon)
        .bind(&folder.description)
        .bind(folder.visibility)
        .bind(folder.file_count)
        .bind(folder.total_size)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("folders_path_key") =>
            {
                AppError::conflict(format!("Folder path '{}' already exists", folder.path))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to save folder", e),
        })?;
        Ok(())
    }

    /// Delete folders inside a transaction. Returns the number removed.
    pub async fn delete_many(conn: &mut PgConnection, ids: &[FolderId]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete folders", e)
            })?;
        Ok(result.rows_affected())
    }
}
