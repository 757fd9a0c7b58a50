//! Job pipeline: lease, execute, finalize and record activity.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use modsync_client::RemoteError;
use modsync_core::error::{AppError, ErrorKind};
use modsync_core::result::AppResult;
use modsync_core::types::JobId;
use modsync_database::{ActivityLog, JobStore};
use modsync_entity::activity::CreateActivityEntry;
use modsync_entity::job::{Job, JobPayload, TerminalStatus};

use crate::lease::LeaseManager;

/// Kind-specific work function run on a leased job.
#[async_trait]
pub trait JobHandler<P: JobPayload>: Send + Sync + fmt::Debug + 'static {
    /// Activity details derivable from the job alone, used when the work
    /// function fails before it can report richer ones.
    fn describe(&self, job: &Job<P>) -> JobReport;

    /// Run the work function. Re-running it after a crash must converge
    /// to the same end state.
    async fn execute(
        &self,
        job: &Job<P>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobExecutionError>;
}

/// What a finished job did, as recorded in the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Human-readable subject name.
    pub name: String,
    /// Version before the job, if it concerns one.
    pub from_version: Option<String>,
    /// Version after the job, if it concerns one.
    pub to_version: Option<String>,
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The catalog call failed after the client's own retries.
    #[error("{0}")]
    Remote(RemoteError),

    /// The subject or a catalog resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The subject is not in the state the job expects.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The job payload is unusable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The job's cancellation token fired; the job stays `Running`.
    #[error("job interrupted")]
    Interrupted,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(AppError),
}

impl JobExecutionError {
    /// Whether the job should be left for the recovery sweep.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<RemoteError> for JobExecutionError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Canceled => Self::Interrupted,
            other => Self::Remote(other),
        }
    }
}

impl From<AppError> for JobExecutionError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::NotFound => Self::NotFound(err.message),
            ErrorKind::InvalidTransition => Self::InvalidTransition(err.message),
            ErrorKind::Validation => Self::Validation(err.message),
            ErrorKind::Canceled => Self::Interrupted,
            _ => Self::Internal(err),
        }
    }
}

/// Result of offering one job id to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Another worker holds or finished the job.
    Skipped,
    /// The job finished as `Succeeded`.
    Succeeded,
    /// The job finished as `Failed`.
    Failed,
    /// Cancellation stopped the job mid-flight; it is still `Running`.
    Interrupted,
}

/// Counts from one pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs that succeeded.
    pub succeeded: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Ids skipped because the lease was lost.
    pub skipped: usize,
    /// Jobs interrupted by cancellation.
    pub interrupted: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Succeeded => self.succeeded += 1,
            ProcessOutcome::Failed => self.failed += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
            ProcessOutcome::Interrupted => self.interrupted += 1,
        }
    }
}

/// Lease → execute → finalize skeleton shared by all job kinds.
#[derive(Debug)]
pub struct JobPipeline<P: JobPayload> {
    store: Arc<dyn JobStore<Payload = P>>,
    lease: LeaseManager<P>,
    handler: Arc<dyn JobHandler<P>>,
    activity: Arc<dyn ActivityLog>,
}

impl<P: JobPayload> JobPipeline<P> {
    /// Create a pipeline for one job kind.
    pub fn new(
        store: Arc<dyn JobStore<Payload = P>>,
        handler: Arc<dyn JobHandler<P>>,
        activity: Arc<dyn ActivityLog>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            lease: LeaseManager::new(Arc::clone(&store), worker_id),
            store,
            handler,
            activity,
        }
    }

    /// The store this pipeline drains.
    pub fn store(&self) -> &Arc<dyn JobStore<Payload = P>> {
        &self.store
    }

    /// Lease and run one job.
    ///
    /// Work-function failures become the job's `Failed` status and are not
    /// returned. A job that was leased but cannot be read back is failed
    /// too; only store failures while finishing it surface as `Err`.
    pub async fn process(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> AppResult<ProcessOutcome> {
        if cancel.is_cancelled() {
            return Ok(ProcessOutcome::Skipped);
        }
        if !self.lease.try_lease(job_id).await? {
            return Ok(ProcessOutcome::Skipped);
        }

        // The lease is ours now; a failed read must still finish the job.
        let job = match self.store.get(job_id).await {
            Ok(job) => job,
            Err(e) => {
                error!(
                    job_id = %job_id,
                    kind = %P::KIND,
                    error = %e,
                    "Failed to load leased job, marking it failed"
                );
                self.store
                    .mark_terminal(job_id, TerminalStatus::Failed, Some(&e.to_string()))
                    .await?;
                return Ok(ProcessOutcome::Failed);
            }
        };
        let (status, error, report) = match self.handler.execute(&job, cancel).await {
            Ok(report) => (TerminalStatus::Succeeded, None, report),
            Err(e) if e.is_interrupted() => {
                warn!(
                    job_id = %job_id,
                    kind = %P::KIND,
                    "Job interrupted, leaving it running for the recovery sweep"
                );
                return Ok(ProcessOutcome::Interrupted);
            }
            Err(e) => (TerminalStatus::Failed, Some(e.to_string()), self.handler.describe(&job)),
        };

        self.store
            .mark_terminal(job_id, status, error.as_deref())
            .await?;

        match &error {
            None => info!(job_id = %job_id, kind = %P::KIND, subject = %job.subject_id, "Job succeeded"),
            Some(message) => warn!(
                job_id = %job_id,
                kind = %P::KIND,
                subject = %job.subject_id,
                error = %message,
                "Job failed"
            ),
        }

        let entry = CreateActivityEntry {
            subject_id: job.subject_id,
            job_id: job_id.get(),
            action: format!("{}.{status}", P::KIND.action()),
            name: report.name,
            from_version: report.from_version,
            to_version: report.to_version,
        };
        if let Err(e) = self.activity.append(&entry).await {
            error!(job_id = %job_id, error = %e, "Failed to record job activity");
        }

        Ok(match status {
            TerminalStatus::Succeeded => ProcessOutcome::Succeeded,
            TerminalStatus::Failed => ProcessOutcome::Failed,
        })
    }

    /// Offer up to `limit` queued jobs to [`Self::process`], oldest first.
    ///
    /// A store error on one job is logged and the batch moves on.
    pub async fn run_queued(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();
        for job_id in self.store.list_queued(limit).await? {
            if cancel.is_cancelled() {
                break;
            }
            match self.process(job_id, cancel).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!(job_id = %job_id, kind = %P::KIND, error = %e, "Failed to process job");
                }
            }
        }
        Ok(summary)
    }
}
