//! Cron scheduler for periodic catalog syncs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use modsync_core::error::AppError;
use modsync_core::result::AppResult;
use modsync_database::ModRegistry;
use modsync_entity::job::SyncPayload;

use crate::queue::{IdempotencyKey, JobQueue};

/// Cron-based scheduler enqueueing catalog syncs.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue for enqueuing scheduled work
    queue: Arc<JobQueue>,
    mods: Arc<dyn ModRegistry>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>, mods: Arc<dyn ModRegistry>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            queue,
            mods,
        })
    }

    /// Enqueue a sync of every instance on `cron` (six fields, seconds first).
    pub async fn register_catalog_sync(&self, cron: &str) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let mods = Arc::clone(&self.mods);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let mods = Arc::clone(&mods);
            Box::pin(async move {
                debug!("Scheduling catalog sync jobs");
                if let Err(e) = enqueue_scheduled_syncs(&queue, mods.as_ref(), Utc::now()).await {
                    error!(error = %e, "Failed to enqueue scheduled catalog syncs");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid catalog sync schedule '{cron}': {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add catalog sync schedule: {e}")))?;

        info!(cron, "Registered: catalog_sync");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Enqueue one sync job per instance for the tick at `tick`.
///
/// Returns how many jobs were newly created; ticks repeated within the
/// same minute collapse onto the existing jobs.
pub async fn enqueue_scheduled_syncs(
    queue: &JobQueue,
    mods: &dyn ModRegistry,
    tick: DateTime<Utc>,
) -> AppResult<usize> {
    let mut created = 0;
    for instance in mods.list_instances().await? {
        let key = IdempotencyKey::scheduled(instance.id, tick);
        let payload = SyncPayload {
            server_id: instance.server_id.clone(),
        };
        if !queue.enqueue_sync(instance.id, &key, payload).await?.already_existed {
            created += 1;
        }
    }

    debug!(created, "Scheduled catalog syncs");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    use modsync_database::memory::{MemoryActivityLog, MemoryJobStore, MemoryModRegistry};
    use modsync_entity::catalog::Instance;
    use modsync_entity::job::UpdatePayload;
    use modsync_core::types::InstanceId;

    use crate::stores::WorkerStores;

    #[tokio::test]
    async fn test_duplicate_ticks_collapse() {
        let mods = Arc::new(MemoryModRegistry::new());
        for name in ["alpha", "beta"] {
            mods.insert_instance(Instance {
                id: InstanceId::new(),
                name: name.into(),
                server_id: "paper-1.21".into(),
            })
            .await;
        }
        let queue = JobQueue::new(WorkerStores {
            sync_jobs: Arc::new(MemoryJobStore::<SyncPayload>::new()),
            update_jobs: Arc::new(MemoryJobStore::<UpdatePayload>::new()),
            activity: Arc::new(MemoryActivityLog::new()),
            mods: mods.clone(),
        });

        let tick = Utc::now();
        assert_eq!(enqueue_scheduled_syncs(&queue, mods.as_ref(), tick).await.unwrap(), 2);
        assert_eq!(enqueue_scheduled_syncs(&queue, mods.as_ref(), tick).await.unwrap(), 0);

        let next = tick + chrono::Duration::minutes(30);
        assert_eq!(enqueue_scheduled_syncs(&queue, mods.as_ref(), next).await.unwrap(), 2);
        assert_eq!(queue.stats().await.unwrap().sync.queued, 4);
    }

    #[tokio::test]
    async fn test_rejects_invalid_cron() {
        let mods: Arc<dyn ModRegistry> = Arc::new(MemoryModRegistry::new());
        let queue = Arc::new(JobQueue::new(WorkerStores {
            sync_jobs: Arc::new(MemoryJobStore::<SyncPayload>::new()),
            update_jobs: Arc::new(MemoryJobStore::<UpdatePayload>::new()),
            activity: Arc::new(MemoryActivityLog::new()),
            mods: Arc::clone(&mods),
        }));

        let scheduler = CronScheduler::new(queue, mods).await.unwrap();
        let err = scheduler.register_catalog_sync("every now and then").await.unwrap_err();
        assert_eq!(err.kind, modsync_core::error::ErrorKind::Configuration);
    }
}
