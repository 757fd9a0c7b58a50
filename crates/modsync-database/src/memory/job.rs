//! In-memory job store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use modsync_core::error::AppError;
use modsync_core::result::AppResult;
use modsync_core::types::JobId;
use modsync_entity::job::{EnqueueOutcome, Job, JobPayload, JobStatus, TerminalStatus};

use crate::store::JobStore;

#[derive(Debug)]
struct InnerState<P> {
    next_id: i64,
    jobs: BTreeMap<JobId, Job<P>>,
    keys: HashMap<(Uuid, String), JobId>,
}

/// In-memory job store for a single job kind.
#[derive(Debug, Clone)]
pub struct MemoryJobStore<P> {
    state: Arc<Mutex<InnerState<P>>>,
}

impl<P: JobPayload> MemoryJobStore<P> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState {
                next_id: 1,
                jobs: BTreeMap::new(),
                keys: HashMap::new(),
            })),
        }
    }
}

impl<P: JobPayload> Default for MemoryJobStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: JobPayload> JobStore for MemoryJobStore<P> {
    type Payload = P;

    async fn enqueue(
        &self,
        subject_id: Uuid,
        idempotency_key: &str,
        payload: &P,
    ) -> AppResult<EnqueueOutcome> {
        let mut state = self.state.lock().await;

        let key = (subject_id, idempotency_key.to_string());
        if let Some(&job_id) = state.keys.get(&key) {
            return Ok(EnqueueOutcome {
                job_id,
                already_existed: true,
            });
        }

        let job_id = JobId(state.next_id);
        state.next_id += 1;
        state.keys.insert(key, job_id);
        state.jobs.insert(
            job_id,
            Job {
                id: job_id,
                subject_id,
                idempotency_key: idempotency_key.to_string(),
                status: JobStatus::Queued,
                payload: payload.clone(),
                error: None,
                worker_id: None,
                started_at: None,
                ended_at: None,
                created_at: Utc::now(),
            },
        );

        Ok(EnqueueOutcome {
            job_id,
            already_existed: false,
        })
    }

    async fn list_queued(&self, limit: usize) -> AppResult<Vec<JobId>> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Queued)
            .map(|job| job.id)
            .take(limit)
            .collect())
    }

    async fn get(&self, job_id: JobId) -> AppResult<Job<P>> {
        let state = self.state.lock().await;
        state
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("{} job {job_id} not found", P::KIND)))
    }

    async fn try_claim(&self, job_id: JobId, worker_id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status.can_advance_to(JobStatus::Running) => {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                job.worker_id = Some(worker_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_terminal(
        &self,
        job_id: JobId,
        status: TerminalStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::not_found(format!("{} job {job_id} not found", P::KIND)))?;

        if job.is_finished() || !job.status.can_advance_to(status.into()) {
            return Err(AppError::invalid_transition(format!(
                "{} job {job_id} is {}, cannot move to {status}",
                P::KIND,
                job.status
            )));
        }

        job.status = status.into();
        job.ended_at = Some(Utc::now());
        job.error = match status {
            TerminalStatus::Failed => Some(error.unwrap_or("job failed").to_string()),
            TerminalStatus::Succeeded => None,
        };
        Ok(())
    }

    async fn requeue_orphaned(&self) -> AppResult<Vec<JobId>> {
        let mut state = self.state.lock().await;
        let mut requeued = Vec::new();
        for job in state.jobs.values_mut() {
            if job.is_orphaned() {
                job.status = JobStatus::Queued;
                job.started_at = None;
                job.worker_id = None;
                requeued.push(job.id);
            }
        }
        Ok(requeued)
    }

    async fn list_for_subject(&self, subject_id: Uuid, limit: usize) -> AppResult<Vec<Job<P>>> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .rev()
            .filter(|job| job.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.jobs.values().filter(|job| job.status == status).count() as i64)
    }
}
