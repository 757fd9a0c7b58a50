//! Exclusive claims on queued jobs.

use std::sync::Arc;

use tracing::debug;

use modsync_core::result::AppResult;
use modsync_core::types::JobId;
use modsync_database::JobStore;
use modsync_entity::job::JobPayload;

/// Grants at most one worker the right to execute a queued job.
///
/// The claim is a single conditional write in the store; there is no
/// lock held between the check and the update.
#[derive(Debug)]
pub struct LeaseManager<P: JobPayload> {
    store: Arc<dyn JobStore<Payload = P>>,
    worker_id: String,
}

impl<P: JobPayload> LeaseManager<P> {
    /// Create a lease manager that records `worker_id` on won leases.
    pub fn new(store: Arc<dyn JobStore<Payload = P>>, worker_id: impl Into<String>) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
        }
    }

    /// Try to move `job_id` from `Queued` to `Running`.
    ///
    /// `false` means another worker won or the job already advanced.
    pub async fn try_lease(&self, job_id: JobId) -> AppResult<bool> {
        let won = self.store.try_claim(job_id, &self.worker_id).await?;
        if won {
            debug!(job_id = %job_id, kind = %P::KIND, worker_id = %self.worker_id, "Lease acquired");
        } else {
            debug!(job_id = %job_id, kind = %P::KIND, "Lease not acquired, skipping");
        }
        Ok(won)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modsync_database::memory::MemoryJobStore;
    use modsync_entity::job::{JobStatus, SyncPayload};
    use uuid::Uuid;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_only_one_lease_manager_wins() {
        let store = Arc::new(MemoryJobStore::<SyncPayload>::new());
        let job_id = store
            .enqueue(
                Uuid::new_v4(),
                "tick",
                &SyncPayload {
                    server_id: "paper-1.21".into(),
                },
            )
            .await
            .unwrap()
            .job_id;

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let lease = LeaseManager::<SyncPayload>::new(store.clone(), format!("worker-{i}"));
                tokio::spawn(async move { lease.try_lease(job_id).await.unwrap() })
            })
            .collect();

        let wins = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|won| *won.as_ref().unwrap())
            .count();

        assert_eq!(wins, 1);
        let job = store.get(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.worker_id.unwrap().starts_with("worker-"));
    }
}
