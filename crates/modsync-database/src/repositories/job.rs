//! PostgreSQL job store, one table per job kind.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use modsync_core::error::{AppError, ErrorKind};
use modsync_core::result::AppResult;
use modsync_core::types::JobId;
use modsync_entity::job::{EnqueueOutcome, Job, JobPayload, JobStatus, TerminalStatus};

use crate::store::JobStore;

const JOB_COLUMNS: &str = "id, subject_id, idempotency_key, status, payload, error, worker_id, \
                           started_at, ended_at, created_at";

/// Raw job row; the payload is decoded into the kind's type afterwards.
#[derive(Debug, FromRow)]
struct JobRow {
    id: JobId,
    subject_id: Uuid,
    idempotency_key: String,
    status: JobStatus,
    payload: serde_json::Value,
    error: Option<String>,
    worker_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job<P: JobPayload>(self) -> AppResult<Job<P>> {
        let payload = serde_json::from_value(self.payload).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Corrupt {} payload on job {}", P::KIND, self.id),
                e,
            )
        })?;

        Ok(Job {
            id: self.id,
            subject_id: self.subject_id,
            idempotency_key: self.idempotency_key,
            status: self.status,
            payload,
            error: self.error,
            worker_id: self.worker_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            created_at: self.created_at,
        })
    }
}

/// Repository for jobs of the kind named by `P`.
#[derive(Debug, Clone)]
pub struct PgJobStore<P> {
    pool: PgPool,
    _payload: PhantomData<fn() -> P>,
}

impl<P: JobPayload> PgJobStore<P> {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _payload: PhantomData,
        }
    }

    fn table(&self) -> &'static str {
        P::KIND.table()
    }

    async fn current_status(&self, job_id: JobId) -> AppResult<Option<JobStatus>> {
        let sql = format!("SELECT status FROM {} WHERE id = $1", self.table());
        sqlx::query_scalar::<_, JobStatus>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read job status", e))
    }
}

#[async_trait]
impl<P: JobPayload> JobStore for PgJobStore<P> {
    type Payload = P;

    async fn enqueue(
        &self,
        subject_id: Uuid,
        idempotency_key: &str,
        payload: &P,
    ) -> AppResult<EnqueueOutcome> {
        let payload = serde_json::to_value(payload)?;

        // The loser of a concurrent insert blocks on the winner's commit,
        // then observes the conflict and falls through to the lookup.
        let insert = format!(
            "INSERT INTO {} (subject_id, idempotency_key, payload) VALUES ($1, $2, $3) \
             ON CONFLICT (subject_id, idempotency_key) DO NOTHING RETURNING id",
            self.table()
        );
        let inserted = sqlx::query_scalar::<_, JobId>(&insert)
            .bind(subject_id)
            .bind(idempotency_key)
            .bind(&payload)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue job", e))?;

        if let Some(job_id) = inserted {
            return Ok(EnqueueOutcome {
                job_id,
                already_existed: false,
            });
        }

        let lookup = format!(
            "SELECT id FROM {} WHERE subject_id = $1 AND idempotency_key = $2",
            self.table()
        );
        let job_id = sqlx::query_scalar::<_, JobId>(&lookup)
            .bind(subject_id)
            .bind(idempotency_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to look up existing job", e)
            })?;

        Ok(EnqueueOutcome {
            job_id,
            already_existed: true,
        })
    }

    async fn list_queued(&self, limit: usize) -> AppResult<Vec<JobId>> {
        let sql = format!(
            "SELECT id FROM {} WHERE status = 'queued' ORDER BY id ASC LIMIT $1",
            self.table()
        );
        sqlx::query_scalar::<_, JobId>(&sql)
            .bind(super::sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list queued jobs", e))
    }

    async fn get(&self, job_id: JobId) -> AppResult<Job<P>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM {} WHERE id = $1", self.table());
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))?;

        match row {
            Some(row) => row.into_job(),
            None => Err(AppError::not_found(format!(
                "{} job {job_id} not found",
                P::KIND
            ))),
        }
    }

    async fn try_claim(&self, job_id: JobId, worker_id: &str) -> AppResult<bool> {
        let sql = format!(
            "UPDATE {} SET status = 'running', started_at = NOW(), worker_id = $2 \
             WHERE id = $1 AND status = 'queued'",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(job_id)
            .bind(worker_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lease job", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_terminal(
        &self,
        job_id: JobId,
        status: TerminalStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        let error = match status {
            TerminalStatus::Failed => Some(error.unwrap_or("job failed")),
            TerminalStatus::Succeeded => None,
        };
        let sql = format!(
            "UPDATE {} SET status = $2, error = $3, ended_at = NOW() \
             WHERE id = $1 AND status = 'running' AND ended_at IS NULL",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(job_id)
            .bind(JobStatus::from(status))
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finish job", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.current_status(job_id).await? {
            None => Err(AppError::not_found(format!(
                "{} job {job_id} not found",
                P::KIND
            ))),
            Some(current) => Err(AppError::invalid_transition(format!(
                "{} job {job_id} is {current}, cannot move to {status}",
                P::KIND
            ))),
        }
    }

    async fn requeue_orphaned(&self) -> AppResult<Vec<JobId>> {
        let sql = format!(
            "UPDATE {} SET status = 'queued', started_at = NULL, worker_id = NULL \
             WHERE status = 'running' AND ended_at IS NULL RETURNING id",
            self.table()
        );
        let mut ids = sqlx::query_scalar::<_, JobId>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to requeue orphaned jobs", e)
            })?;
        ids.sort();
        Ok(ids)
    }

    async fn list_for_subject(&self, subject_id: Uuid, limit: usize) -> AppResult<Vec<Job<P>>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM {} WHERE subject_id = $1 ORDER BY id DESC LIMIT $2",
            self.table()
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(subject_id)
            .bind(super::sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list jobs for subject", e)
            })?;

        rows.into_iter().map(|row| row.into_job::<P>()).collect()
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE status = $1", self.table());
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }
}
