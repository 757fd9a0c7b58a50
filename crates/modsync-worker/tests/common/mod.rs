//! Fixture catalog and in-memory stores for worker tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use modsync_client::{CatalogProject, CatalogSource, CatalogVersion, RemoteError};
use modsync_core::types::{InstanceId, ModId};
use modsync_database::memory::{MemoryActivityLog, MemoryJobStore, MemoryModRegistry};
use modsync_entity::catalog::{Instance, TrackedMod};
use modsync_entity::job::{SyncPayload, UpdatePayload};
use modsync_worker::WorkerStores;

pub const SERVER: &str = "paper-1.21";

/// Catalog answering from a fixed table of versions.
#[derive(Debug, Default)]
pub struct FixtureCatalog {
    versions: Mutex<HashMap<String, Vec<CatalogVersion>>>,
    failure: Mutex<Option<RemoteError>>,
    pub calls: AtomicUsize,
}

impl FixtureCatalog {
    pub fn publish(&self, project_id: &str, version_number: &str, day: u32) {
        let version = CatalogVersion {
            id: format!("{project_id}-{version_number}"),
            project_id: project_id.to_string(),
            version_number: version_number.to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
        };
        self.versions
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .push(version);
    }

    /// Make every subsequent call fail with `error`.
    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    fn check(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(what: &str) -> RemoteError {
        RemoteError::ClientError {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn project(
        &self,
        project_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<CatalogProject, RemoteError> {
        self.check()?;
        if !self.versions.lock().unwrap().contains_key(project_id) {
            return Err(Self::not_found(project_id));
        }
        Ok(CatalogProject {
            id: project_id.to_string(),
            name: project_id.to_string(),
            summary: None,
        })
    }

    async fn versions(
        &self,
        project_id: &str,
        server_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CatalogVersion>, RemoteError> {
        self.check()?;
        if server_id != SERVER {
            return Ok(Vec::new());
        }
        self.versions
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .ok_or_else(|| Self::not_found(project_id))
    }

    async fn version(
        &self,
        project_id: &str,
        version_number: &str,
        _cancel: &CancellationToken,
    ) -> Result<CatalogVersion, RemoteError> {
        self.check()?;
        self.versions
            .lock()
            .unwrap()
            .get(project_id)
            .and_then(|vs| vs.iter().find(|v| v.version_number == version_number).cloned())
            .ok_or_else(|| Self::not_found(version_number))
    }
}

/// In-memory world with one instance tracking one mod.
pub struct World {
    pub sync_jobs: Arc<MemoryJobStore<SyncPayload>>,
    pub update_jobs: Arc<MemoryJobStore<UpdatePayload>>,
    pub activity: Arc<MemoryActivityLog>,
    pub mods: Arc<MemoryModRegistry>,
    pub catalog: Arc<FixtureCatalog>,
    pub instance: Instance,
    pub tracked: TrackedMod,
}

impl World {
    pub async fn new() -> Self {
        let mods = Arc::new(MemoryModRegistry::new());
        let instance = Instance {
            id: InstanceId::new(),
            name: "survival".into(),
            server_id: SERVER.into(),
        };
        let tracked = TrackedMod {
            id: ModId::new(),
            instance_id: instance.id,
            catalog_project_id: "sodium".into(),
            name: "Sodium".into(),
            current_version: Some("0.5.0".into()),
            available_version: None,
            updated_at: Utc::now(),
        };
        mods.insert_instance(instance.clone()).await;
        mods.insert_mod(tracked.clone()).await;

        let catalog = Arc::new(FixtureCatalog::default());
        catalog.publish("sodium", "0.5.0", 1);
        catalog.publish("sodium", "0.6.0", 20);

        Self {
            sync_jobs: Arc::new(MemoryJobStore::new()),
            update_jobs: Arc::new(MemoryJobStore::new()),
            activity: Arc::new(MemoryActivityLog::new()),
            mods,
            catalog,
            instance,
            tracked,
        }
    }

    pub fn stores(&self) -> WorkerStores {
        WorkerStores {
            sync_jobs: self.sync_jobs.clone(),
            update_jobs: self.update_jobs.clone(),
            activity: self.activity.clone(),
            mods: self.mods.clone(),
        }
    }
}
