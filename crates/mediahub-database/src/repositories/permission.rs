//! Folder permission repository implementation.

use sqlx::{PgConnection, PgPool};

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FolderId, PermissionId, UserId};
use mediahub_entity::permission::FolderPermission;

/// Repository for folder permission grants.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a grant by ID.
    pub async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<FolderPermission>> {
        sqlx::query_as::<_, FolderPermission>("SELECT * FROM folder_permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find grant", e))
    }

    /// List every grant on a folder, expired ones included.
    pub async fn find_by_folder(&self, folder_id: FolderId) -> AppResult<Vec<FolderPermission>> {
        sqlx::query_as::<_, FolderPermission>(
            "SELECT * FROM folder_permissions WHERE folder_id = $1 ORDER BY granted_at ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list grants", e))
    }

    /// List a user's grants on a set of folders.
    pub async fn find_for_user(
        &self,
        user_id: UserId,
        folder_ids: &[FolderId],
    ) -> AppResult<Vec<FolderPermission>> {
        sqlx::query_as::<_, FolderPermission>(
            "SELECT * FROM folder_permissions WHERE user_id = $1 AND folder_id = ANY($2)",
        )
        .bind(user_id)
        .bind(folder_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list user grants", e)
        })
    }

    /// Insert or replace a grant.
    pub async fn upsert(&self, permission: &FolderPermission) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        Self::upsert_in(&mut *conn, permission).await
    }

    /// Insert or replace a grant on an existing connection or transaction.
    pub async fn upsert_in(conn: &mut PgConnection, permission: &FolderPermission) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO folder_permissions (id, folder_id, user_id, level, granted_by, granted_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET level = EXCLUDED.level, \
                granted_by = EXCLUDED.granted_by, granted_at = EXCLUDED.granted_at, \
                expires_at = EXCLUDED.expires_at",
        )
        .bind(permission.id)
        .bind(permission.folder_id)
        .bind(permission.user_id)
        .bind(permission.level)
        .bind(permission.granted_by)
        .bind(permission.granted_at)
        .bind(permission.expires_at)
        .execute(conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("folder_permissions_folder_id_user_id_key") =>
            {
                AppError::conflict(format!(
                    "User {} already holds a grant on folder {}",
                    permission.user_id, permission.folder_id
                ))
            }
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("folder_permissions_folder_id_fkey") =>
            {
                AppError::not_found(format!("Folder {} not found", permission.folder_id))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to save grant", e),
        })?;
        Ok(())
    }

    /// Delete a grant.
    pub async fn delete(&self, id: PermissionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM folder_permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete grant", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every grant on the given folders inside a transaction.
    pub async fn delete_by_folders(conn: &mut PgConnection, ids: &[FolderId]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folder_permissions WHERE folder_id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete folder grants", e)
            })?;
        Ok(result.rows_affected())
    }
}
