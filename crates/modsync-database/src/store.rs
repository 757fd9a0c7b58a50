//! Store traits shared by the PostgreSQL and in-memory backends.
//!
//! Implementations must make [`JobStore::enqueue`] and
//! [`JobStore::try_claim`] atomic against concurrent callers: the claim is
//! the only thing standing between two workers and the same job.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use modsync_core::result::AppResult;
use modsync_core::types::{InstanceId, JobId, ModId};
use modsync_entity::activity::{ActivityEntry, CreateActivityEntry};
use modsync_entity::catalog::{Instance, TrackedMod};
use modsync_entity::job::{EnqueueOutcome, Job, JobPayload, JobStatus, TerminalStatus};

/// Persisted job records of a single kind.
#[async_trait]
pub trait JobStore: Send + Sync + fmt::Debug + 'static {
    /// Payload type, which also fixes the job kind.
    type Payload: JobPayload;

    /// Insert a `Queued` job, or return the existing one for the same
    /// `(subject_id, idempotency_key)` without modifying it.
    async fn enqueue(
        &self,
        subject_id: Uuid,
        idempotency_key: &str,
        payload: &Self::Payload,
    ) -> AppResult<EnqueueOutcome>;

    /// Ids of queued jobs, oldest first.
    async fn list_queued(&self, limit: usize) -> AppResult<Vec<JobId>>;

    /// Fetch a job. Fails with `NotFound` if absent.
    async fn get(&self, job_id: JobId) -> AppResult<Job<Self::Payload>>;

    /// Move a job from `Queued` to `Running` in one conditional write.
    ///
    /// Returns `true` only for the caller whose write changed the row.
    async fn try_claim(&self, job_id: JobId, worker_id: &str) -> AppResult<bool>;

    /// Finish a running job. Fails with `InvalidTransition` when the job
    /// is not `Running`, and `NotFound` when it does not exist.
    async fn mark_terminal(
        &self,
        job_id: JobId,
        status: TerminalStatus,
        error: Option<&str>,
    ) -> AppResult<()>;

    /// Return every `Running` job without `ended_at` to `Queued`.
    async fn requeue_orphaned(&self) -> AppResult<Vec<JobId>>;

    /// Most recent jobs for a subject, newest first.
    async fn list_for_subject(
        &self,
        subject_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Job<Self::Payload>>>;

    /// Number of jobs currently in `status`.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;
}

/// Append-only activity log.
#[async_trait]
pub trait ActivityLog: Send + Sync + fmt::Debug + 'static {
    /// Append one immutable entry.
    async fn append(&self, entry: &CreateActivityEntry) -> AppResult<ActivityEntry>;

    /// Most recent entries for a subject, newest first.
    async fn list_for_subject(&self, subject_id: Uuid, limit: usize)
    -> AppResult<Vec<ActivityEntry>>;
}

/// Instance and mod metadata read and updated by work functions.
#[async_trait]
pub trait ModRegistry: Send + Sync + fmt::Debug + 'static {
    /// All managed instances.
    async fn list_instances(&self) -> AppResult<Vec<Instance>>;

    /// Look up an instance.
    async fn find_instance(&self, id: InstanceId) -> AppResult<Option<Instance>>;

    /// Look up a tracked mod.
    async fn find_mod(&self, id: ModId) -> AppResult<Option<TrackedMod>>;

    /// Mods tracked on an instance.
    async fn list_mods(&self, instance_id: InstanceId) -> AppResult<Vec<TrackedMod>>;

    /// Record the newest compatible catalog version.
    async fn set_available_version(&self, id: ModId, version: Option<&str>) -> AppResult<()>;

    /// Record the installed version.
    async fn set_current_version(&self, id: ModId, version: &str) -> AppResult<()>;
}
