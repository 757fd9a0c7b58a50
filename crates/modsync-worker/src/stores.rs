//! Store handles shared by the worker components.

use std::sync::Arc;

use modsync_database::{ActivityLog, DatabasePool, JobStore, ModRegistry};
use modsync_entity::job::{SyncPayload, UpdatePayload};

/// The stores one worker process operates on.
#[derive(Debug, Clone)]
pub struct WorkerStores {
    /// Catalog sync jobs.
    pub sync_jobs: Arc<dyn JobStore<Payload = SyncPayload>>,
    /// Mod update jobs.
    pub update_jobs: Arc<dyn JobStore<Payload = UpdatePayload>>,
    /// Append-only activity log.
    pub activity: Arc<dyn ActivityLog>,
    /// Instance and mod metadata.
    pub mods: Arc<dyn ModRegistry>,
}

impl WorkerStores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn from_database(db: &DatabasePool) -> Self {
        Self {
            sync_jobs: Arc::new(db.job_store::<SyncPayload>()),
            update_jobs: Arc::new(db.job_store::<UpdatePayload>()),
            activity: Arc::new(db.activity_log()),
            mods: Arc::new(db.mod_registry()),
        }
    }
}
