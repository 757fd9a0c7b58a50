//! Startup recovery of jobs orphaned by a crash.

use serde::Serialize;
use tracing::{info, warn};

use modsync_core::result::AppResult;
use modsync_core::types::JobId;
use modsync_database::JobStore;
use modsync_entity::job::JobPayload;

use crate::stores::WorkerStores;

/// Jobs returned to the queue by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Requeued sync jobs.
    pub sync_jobs: Vec<JobId>,
    /// Requeued update jobs.
    pub update_jobs: Vec<JobId>,
}

impl RecoveryReport {
    /// Total number of requeued jobs.
    pub fn total(&self) -> usize {
        self.sync_jobs.len() + self.update_jobs.len()
    }
}

/// Requeues every `Running` job without `ended_at`.
///
/// Must run before any worker starts leasing: a job leased by this
/// process looks exactly like one orphaned by the previous process.
#[derive(Debug, Clone)]
pub struct RecoverySweep {
    stores: WorkerStores,
}

impl RecoverySweep {
    /// Create a sweep over the worker's stores.
    pub fn new(stores: WorkerStores) -> Self {
        Self { stores }
    }

    /// Run the sweep over every job kind.
    pub async fn run(&self) -> AppResult<RecoveryReport> {
        let report = RecoveryReport {
            sync_jobs: requeue(self.stores.sync_jobs.as_ref()).await?,
            update_jobs: requeue(self.stores.update_jobs.as_ref()).await?,
        };

        if report.total() == 0 {
            info!("Recovery sweep found no orphaned jobs");
        }
        Ok(report)
    }
}

async fn requeue<P: JobPayload>(store: &dyn JobStore<Payload = P>) -> AppResult<Vec<JobId>> {
    let ids = store.requeue_orphaned().await?;
    if !ids.is_empty() {
        warn!(kind = %P::KIND, count = ids.len(), ids = ?ids, "Requeued orphaned jobs");
    }
    Ok(ids)
}
