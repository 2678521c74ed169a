//! Direct file statistics per folder.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::types::FolderId;
use mediahub_entity::folder::FileStats;

/// SQLSTATE for a failed CHECK constraint.
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for an integer out of range.
const OUT_OF_RANGE: &str = "22003";
/// SQLSTATE for a missing referenced row.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Repository for the file counts and byte totals directly inside folders.
#[derive(Debug, Clone)]
pub struct FileStatsRepository {
    pool: PgPool,
}

impl FileStatsRepository {
    /// Create a new file stats repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Direct statistics of each folder that has files.
    pub async fn direct_stats(&self, ids: &[FolderId]) -> AppResult<HashMap<FolderId, FileStats>> {
        let rows: Vec<(FolderId, i64, i64)> = sqlx::query_as(
            "SELECT folder_id, file_count, total_size FROM folder_file_stats \
             WHERE folder_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read file stats", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, count, size)| (id, FileStats::new(count, size)))
            .collect())
    }

    /// Add a signed delta to a folder's direct statistics on an existing
    /// transaction. Rows that reach zero are removed.
    pub async fn apply_delta_in(
        conn: &mut PgConnection,
        folder_id: FolderId,
        delta: FileStats,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO folder_file_stats (folder_id, file_count, total_size) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (folder_id) DO UPDATE SET \
                file_count = folder_file_stats.file_count + EXCLUDED.file_count, \
                total_size = folder_file_stats.total_size + EXCLUDED.total_size",
        )
        .bind(folder_id)
        .bind(delta.file_count)
        .bind(delta.total_size)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if matches!(db_err.code().as_deref(), Some(CHECK_VIOLATION | OUT_OF_RANGE)) =>
            {
                AppError::validation(format!(
                    "File change would leave folder {folder_id} with invalid statistics"
                ))
            }
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                AppError::not_found(format!("Folder {folder_id} not found"))
            }
            other => {
                AppError::with_source(ErrorKind::Database, "Failed to update file stats", other)
            }
        })?;

        sqlx::query(
            "DELETE FROM folder_file_stats \
             WHERE folder_id = $1 AND file_count = 0 AND total_size = 0",
        )
        .bind(folder_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update file stats", e))?;

        Ok(())
    }
}
