//! Job submission and status polling.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use modsync_core::error::AppError;
use modsync_core::result::AppResult;
use modsync_core::types::{InstanceId, JobId, ModId};
use modsync_database::JobStore;
use modsync_entity::job::{
    EnqueueOutcome, JobKind, JobPayload, JobStatus, JobStatusView, SyncPayload, UpdatePayload,
};

use crate::stores::WorkerStores;

/// Longest accepted idempotency key.
pub const MAX_KEY_LEN: usize = 200;

/// Caller-chosen token collapsing duplicate submissions onto one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap a caller-supplied key.
    pub fn new(key: impl Into<String>) -> AppResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(AppError::validation("Idempotency key must not be empty"));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(AppError::validation(format!(
                "Idempotency key exceeds {MAX_KEY_LEN} bytes"
            )));
        }
        Ok(Self(key))
    }

    /// Fresh key for one logical update request. Clients that retry the
    /// same request must resend the key they received.
    pub fn for_update(mod_id: ModId, to_version: &str) -> Self {
        let nonce = Uuid::new_v4().simple().to_string();
        let prefix = format!("update:{mod_id}:");
        let suffix = format!(":{}", &nonce[..12]);

        // Only the version is shortened so the nonce always survives.
        let budget = MAX_KEY_LEN.saturating_sub(prefix.len() + suffix.len());
        let mut version = to_version;
        while version.len() > budget {
            let mut cut = budget.min(version.len() - 1);
            while !version.is_char_boundary(cut) {
                cut -= 1;
            }
            version = &version[..cut];
        }
        Self(format!("{prefix}{version}{suffix}"))
    }

    /// Key shared by every scheduler tick within the same minute, so a
    /// duplicated tick does not create a second sync job.
    pub fn scheduled(instance_id: InstanceId, tick: DateTime<Utc>) -> Self {
        Self(format!("sync:{instance_id}:{}", tick.format("%Y%m%dT%H%M")))
    }

    /// The key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job counts per status for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    /// Waiting for a worker.
    pub queued: i64,
    /// Leased and in progress.
    pub running: i64,
    /// Finished successfully.
    pub succeeded: i64,
    /// Finished with an error.
    pub failed: i64,
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Catalog sync jobs.
    pub sync: KindStats,
    /// Mod update jobs.
    pub update: KindStats,
}

/// Entry point for creating and polling jobs.
#[derive(Debug, Clone)]
pub struct JobQueue {
    stores: WorkerStores,
    /// Woken after a new job is inserted.
    waker: Arc<Notify>,
}

impl JobQueue {
    /// Create a queue over the given stores.
    pub fn new(stores: WorkerStores) -> Self {
        Self {
            stores,
            waker: Arc::new(Notify::new()),
        }
    }

    /// Signal fired whenever a new job is inserted.
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.waker)
    }

    /// Request a catalog sync of an instance.
    pub async fn enqueue_sync(
        &self,
        instance_id: InstanceId,
        key: &IdempotencyKey,
        payload: SyncPayload,
    ) -> AppResult<EnqueueOutcome> {
        self.enqueue(self.stores.sync_jobs.as_ref(), instance_id.into_uuid(), key, &payload)
            .await
    }

    /// Request a version change of a tracked mod.
    pub async fn enqueue_update(
        &self,
        mod_id: ModId,
        key: &IdempotencyKey,
        payload: UpdatePayload,
    ) -> AppResult<EnqueueOutcome> {
        self.enqueue(self.stores.update_jobs.as_ref(), mod_id.into_uuid(), key, &payload)
            .await
    }

    async fn enqueue<P: JobPayload>(
        &self,
        store: &dyn JobStore<Payload = P>,
        subject_id: Uuid,
        key: &IdempotencyKey,
        payload: &P,
    ) -> AppResult<EnqueueOutcome> {
        payload.validate()?;
        let outcome = store.enqueue(subject_id, key.as_str(), payload).await?;

        if outcome.already_existed {
            debug!(job_id = %outcome.job_id, kind = %P::KIND, key = %key, "Duplicate submission collapsed");
        } else {
            debug!(job_id = %outcome.job_id, kind = %P::KIND, subject = %subject_id, "Enqueued job");
            self.waker.notify_one();
        }
        Ok(outcome)
    }

    /// Status snapshot for polling.
    pub async fn status(&self, kind: JobKind, job_id: JobId) -> AppResult<JobStatusView> {
        match kind {
            JobKind::Sync => Ok(self.stores.sync_jobs.get(job_id).await?.view()),
            JobKind::Update => Ok(self.stores.update_jobs.get(job_id).await?.view()),
        }
    }

    /// Recent jobs for a subject, newest first.
    pub async fn history(
        &self,
        kind: JobKind,
        subject_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<JobStatusView>> {
        let views = match kind {
            JobKind::Sync => self
                .stores
                .sync_jobs
                .list_for_subject(subject_id, limit)
                .await?
                .iter()
                .map(|job| job.view())
                .collect(),
            JobKind::Update => self
                .stores
                .update_jobs
                .list_for_subject(subject_id, limit)
                .await?
                .iter()
                .map(|job| job.view())
                .collect(),
        };
        Ok(views)
    }

    /// Job counts per kind and status.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            sync: kind_stats(self.stores.sync_jobs.as_ref()).await?,
            update: kind_stats(self.stores.update_jobs.as_ref()).await?,
        })
    }
}

async fn kind_stats<P: JobPayload>(store: &dyn JobStore<Payload = P>) -> AppResult<KindStats> {
    Ok(KindStats {
        queued: store.count_by_status(JobStatus::Queued).await?,
        running: store.count_by_status(JobStatus::Running).await?,
        succeeded: store.count_by_status(JobStatus::Succeeded).await?,
        failed: store.count_by_status(JobStatus::Failed).await?,
    })
}
