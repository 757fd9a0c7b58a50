//! Worker runner: main loop that polls for queued jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modsync_core::config::WorkerConfig;
use modsync_entity::job::{JobPayload, SyncPayload, UpdatePayload};

use crate::executor::JobPipeline;

/// Polls both job kinds and runs leased jobs on a bounded pool.
#[derive(Debug)]
pub struct WorkerRunner {
    sync: Arc<JobPipeline<SyncPayload>>,
    update: Arc<JobPipeline<UpdatePayload>>,
    config: WorkerConfig,
    worker_id: String,
    waker: Arc<Notify>,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        sync: Arc<JobPipeline<SyncPayload>>,
        update: Arc<JobPipeline<UpdatePayload>>,
        config: WorkerConfig,
        waker: Arc<Notify>,
    ) -> Self {
        let worker_id = config.resolved_worker_id();
        Self {
            sync,
            update,
            config,
            worker_id,
            waker,
        }
    }

    /// Run until `shutdown` fires, then wait for in-flight jobs.
    ///
    /// Jobs still running after the drain timeout are canceled and stay
    /// `Running` until the next recovery sweep.
    pub async fn run(&self, shutdown: CancellationToken) {
        let concurrency = self.config.concurrency.max(1);
        info!(
            worker_id = %self.worker_id,
            concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let jobs_cancel = CancellationToken::new();
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            self.dispatch(&self.sync, &semaphore, &shutdown, &jobs_cancel)
                .await;
            self.dispatch(&self.update, &semaphore, &shutdown, &jobs_cancel)
                .await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.waker.notified() => debug!("Worker woken by new job"),
                _ = time::sleep(poll_interval) => {}
            }
        }

        info!(worker_id = %self.worker_id, "Worker waiting for in-flight jobs to complete");
        let drain = Duration::from_secs(self.config.drain_timeout_seconds);
        if time::timeout(drain, semaphore.acquire_many(concurrency as u32))
            .await
            .is_err()
        {
            warn!(
                worker_id = %self.worker_id,
                "Drain timeout elapsed, interrupting remaining jobs"
            );
            jobs_cancel.cancel();
        }

        info!(worker_id = %self.worker_id, "Worker shut down complete");
    }

    /// Offer one batch of queued ids of a kind to the pool.
    async fn dispatch<P: JobPayload>(
        &self,
        pipeline: &Arc<JobPipeline<P>>,
        semaphore: &Arc<Semaphore>,
        shutdown: &CancellationToken,
        jobs_cancel: &CancellationToken,
    ) {
        let queued = match pipeline.store().list_queued(self.config.batch_size).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(kind = %P::KIND, error = %e, "Failed to list queued jobs");
                return;
            }
        };

        for job_id in queued {
            let Some(permit) = acquire(semaphore, shutdown).await else {
                return;
            };
            let pipeline = Arc::clone(pipeline);
            let cancel = jobs_cancel.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = pipeline.process(job_id, &cancel).await {
                    error!(job_id = %job_id, kind = %P::KIND, error = %e, "Failed to process job");
                }
            });
        }
    }
}

async fn acquire(
    semaphore: &Arc<Semaphore>,
    shutdown: &CancellationToken,
) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    }
}
