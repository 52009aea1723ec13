// SQLite SnapshotStore Implementation

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use opsmedic_core::domain::{Snapshot, SnapshotId, SnapshotKind, SnapshotMeta};
use opsmedic_core::error::{AppError, Result};
use opsmedic_core::port::{IdProvider, SnapshotStore, TimeProvider};

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // Extract database-specific error code and message
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed
                        AppError::Storage(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "5" => {
                        // SQLITE_BUSY - database is locked
                        AppError::Storage(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    "13" => {
                        // SQLITE_FULL - database or disk is full
                        AppError::Storage(format!("Database full: {}", db_err.message()))
                    }
                    _ => {
                        // Other database errors
                        AppError::Storage(format!(
                            "Database error [{}]: {}",
                            code_str,
                            db_err.message()
                        ))
                    }
                }
            } else {
                AppError::Storage(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Storage("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Storage(format!("Column not found: {}", col))
        }
        _ => {
            // Connection, pool, protocol errors
            AppError::Storage(err.to_string())
        }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: String,
    kind: String,
    meta: String,
    created_at: i64,
}

impl SnapshotRow {
    fn into_domain(self) -> Result<Snapshot> {
        let kind = SnapshotKind::from_str(&self.kind)?;
        let meta: serde_json::Value = serde_json::from_str(&self.meta)?;
        Ok(Snapshot {
            id: self.id,
            kind,
            meta: SnapshotMeta::new(meta),
            created_at: self.created_at,
        })
    }
}

pub struct SqliteSnapshotRepository {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSnapshotRepository {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotRepository {
    async fn capture(&self, kind: SnapshotKind, meta: SnapshotMeta) -> Result<SnapshotId> {
        let created_at = self.time_provider.now_millis();
        // timestamp alone would collide under concurrent capture; the random
        // suffix keeps ids distinct within the same millisecond
        let id = format!("{}-{}-{}", kind, created_at, self.id_provider.generate_suffix());

        sqlx::query("INSERT INTO snapshots (id, kind, meta, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(kind.as_str())
            .bind(meta.as_value().to_string())
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(snapshot_id = %id, kind = %kind, "Snapshot captured");
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Snapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>("SELECT * FROM snapshots WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(SnapshotRow::into_domain).transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Snapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT * FROM snapshots ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(SnapshotRow::into_domain).collect()
    }
}
