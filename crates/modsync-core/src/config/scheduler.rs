//! Periodic sync scheduler configuration.

use serde::{Deserialize, Serialize};

/// Cron scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether periodic catalog syncs are scheduled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for catalog syncs.
    #[serde(default = "default_sync_cron")]
    pub sync_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sync_cron: default_sync_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sync_cron() -> String {
    "0 */30 * * * *".to_string()
}
