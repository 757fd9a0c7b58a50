//! In-memory instance and mod registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use modsync_core::error::AppError;
use modsync_core::result::AppResult;
use modsync_core::types::{InstanceId, ModId};
use modsync_entity::catalog::{Instance, TrackedMod};

use crate::store::ModRegistry;

#[derive(Debug, Default)]
struct InnerState {
    instances: HashMap<InstanceId, Instance>,
    mods: HashMap<ModId, TrackedMod>,
}

/// In-memory registry of instances and their tracked mods.
#[derive(Debug, Clone, Default)]
pub struct MemoryModRegistry {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryModRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an instance.
    pub async fn insert_instance(&self, instance: Instance) {
        self.state
            .lock()
            .await
            .instances
            .insert(instance.id, instance);
    }

    /// Add or replace a tracked mod.
    pub async fn insert_mod(&self, tracked: TrackedMod) {
        self.state.lock().await.mods.insert(tracked.id, tracked);
    }
}

#[async_trait]
impl ModRegistry for MemoryModRegistry {
    async fn list_instances(&self) -> AppResult<Vec<Instance>> {
        let state = self.state.lock().await;
        let mut instances: Vec<Instance> = state.instances.values().cloned().collect();
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(instances)
    }

    async fn find_instance(&self, id: InstanceId) -> AppResult<Option<Instance>> {
        Ok(self.state.lock().await.instances.get(&id).cloned())
    }

    async fn find_mod(&self, id: ModId) -> AppResult<Option<TrackedMod>> {
        Ok(self.state.lock().await.mods.get(&id).cloned())
    }

    async fn list_mods(&self, instance_id: InstanceId) -> AppResult<Vec<TrackedMod>> {
        let state = self.state.lock().await;
        let mut mods: Vec<TrackedMod> = state
            .mods
            .values()
            .filter(|m| m.instance_id == instance_id)
            .cloned()
            .collect();
        mods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mods)
    }

    async fn set_available_version(&self, id: ModId, version: Option<&str>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let tracked = state
            .mods
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Mod {id} not found")))?;
        tracked.available_version = version.map(str::to_string);
        tracked.updated_at = Utc::now();
        Ok(())
    }

    async fn set_current_version(&self, id: ModId, version: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let tracked = state
            .mods
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Mod {id} not found")))?;
        tracked.current_version = Some(version.to_string());
        tracked.updated_at = Utc::now();
        Ok(())
    }
}
