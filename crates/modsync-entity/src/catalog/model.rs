//! Instance and tracked mod models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use modsync_core::types::{InstanceId, ModId};

/// A managed game-server instance whose mods are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Instance {
    /// Instance identifier.
    pub id: InstanceId,
    /// Display name.
    pub name: String,
    /// Remote server identity used to pick compatible catalog versions.
    pub server_id: String,
}

/// A mod installed on an instance and tracked against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrackedMod {
    /// Mod identifier.
    pub id: ModId,
    /// Owning instance.
    pub instance_id: InstanceId,
    /// Project identifier in the remote catalog.
    pub catalog_project_id: String,
    /// Display name.
    pub name: String,
    /// Installed version, `None` when not installed yet.
    pub current_version: Option<String>,
    /// Newest compatible version seen by the last catalog sync.
    pub available_version: Option<String>,
    /// Last metadata change.
    pub updated_at: DateTime<Utc>,
}

impl TrackedMod {
    /// Whether the catalog offers a version other than the installed one.
    pub fn has_update(&self) -> bool {
        match (&self.current_version, &self.available_version) {
            (Some(current), Some(available)) => current != available,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}
