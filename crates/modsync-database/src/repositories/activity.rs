//! Activity log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use modsync_core::error::{AppError, ErrorKind};
use modsync_core::result::AppResult;
use modsync_entity::activity::{ActivityEntry, CreateActivityEntry};

use crate::store::ActivityLog;

/// Repository for activity log entries. Rows are only ever inserted.
#[derive(Debug, Clone)]
pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    /// Create a new activity log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn append(&self, entry: &CreateActivityEntry) -> AppResult<ActivityEntry> {
        sqlx::query_as::<_, ActivityEntry>(
            "INSERT INTO activity_log (subject_id, job_id, action, name, from_version, to_version) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(entry.subject_id)
        .bind(entry.job_id)
        .bind(&entry.action)
        .bind(&entry.name)
        .bind(&entry.from_version)
        .bind(&entry.to_version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append activity", e))
    }

    async fn list_for_subject(
        &self,
        subject_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ActivityEntry>> {
        sqlx::query_as::<_, ActivityEntry>(
            "SELECT * FROM activity_log WHERE subject_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(subject_id)
        .bind(super::sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list activity", e))
    }
}
