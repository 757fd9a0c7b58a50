//! Recovery sweep command.

use modsync_core::error::AppError;
use modsync_core::types::JobId;
use modsync_worker::{RecoverySweep, WorkerStores};

use crate::output::{self, OutputFormat};

/// Requeue every job left `running` by a worker that is gone.
///
/// Only safe while no worker is running against the same database.
pub async fn execute(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let db = super::connect(&config).await?;

    let report = RecoverySweep::new(WorkerStores::from_database(&db))
        .run()
        .await;
    db.close().await;
    let report = report?;

    match format {
        OutputFormat::Json => output::print_item(&report, &[], format),
        OutputFormat::Table if report.total() == 0 => {
            output::print_success("No orphaned jobs found.");
        }
        OutputFormat::Table => {
            output::print_success(&format!("Requeued {} job(s)", report.total()));
            output::print_kv("Sync jobs", &join_ids(&report.sync_jobs));
            output::print_kv("Update jobs", &join_ids(&report.update_jobs));
        }
    }
    Ok(())
}

fn join_ids(ids: &[JobId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
