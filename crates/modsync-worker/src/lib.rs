//! Background job processing for ModSync.
//!
//! This crate provides:
//! - A lease manager granting exclusive execution of a queued job
//! - A job pipeline that leases, executes and finalizes jobs
//! - A recovery sweep that requeues jobs orphaned by a crash
//! - A queue facade for idempotent submission and status polling
//! - A worker runner and a cron scheduler for periodic catalog syncs
//! - The catalog sync and mod update work functions

pub mod executor;
pub mod jobs;
pub mod lease;
pub mod queue;
pub mod recovery;
pub mod runner;
pub mod scheduler;
pub mod stores;

pub use executor::{
    JobExecutionError, JobHandler, JobPipeline, JobReport, ProcessOutcome, RunSummary,
};
pub use lease::LeaseManager;
pub use queue::{IdempotencyKey, JobQueue, QueueStats};
pub use recovery::{RecoveryReport, RecoverySweep};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
pub use stores::WorkerStores;
