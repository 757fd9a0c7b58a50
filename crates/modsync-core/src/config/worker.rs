//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs that may execute at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of queued ids fetched per poll and job kind.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
    /// Identifier recorded on leased jobs. Defaults to `modsync-<pid>`.
    #[serde(default)]
    pub worker_id: Option<String>,
}

impl WorkerConfig {
    /// Resolve the worker identity recorded on leased jobs.
    pub fn resolved_worker_id(&self) -> String {
        self.worker_id
            .clone()
            .unwrap_or_else(|| format!("modsync-{}", std::process::id()))
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            batch_size: default_batch_size(),
            drain_timeout_seconds: default_drain_timeout(),
            worker_id: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_batch_size() -> usize {
    100
}

fn default_drain_timeout() -> u64 {
    30
}
