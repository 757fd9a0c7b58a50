//! Mod update: move a tracked mod from one catalog version to another.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use modsync_client::CatalogSource;
use modsync_core::types::ModId;
use modsync_database::ModRegistry;
use modsync_entity::job::{Job, UpdatePayload};

use crate::executor::{JobExecutionError, JobHandler, JobReport};

/// Handles mod update jobs.
///
/// A crash between the version write and `mark_terminal` leaves the mod
/// already at `to_version`; the re-run detects that and succeeds without
/// writing again.
#[derive(Debug)]
pub struct ModUpdateHandler {
    catalog: Arc<dyn CatalogSource>,
    mods: Arc<dyn ModRegistry>,
}

impl ModUpdateHandler {
    /// Create a new mod update handler
    pub fn new(catalog: Arc<dyn CatalogSource>, mods: Arc<dyn ModRegistry>) -> Self {
        Self { catalog, mods }
    }
}

#[async_trait]
impl JobHandler<UpdatePayload> for ModUpdateHandler {
    fn describe(&self, job: &Job<UpdatePayload>) -> JobReport {
        JobReport {
            name: format!("mod {}", job.subject_id),
            from_version: job.payload.from_version.clone(),
            to_version: Some(job.payload.to_version.clone()),
        }
    }

    async fn execute(
        &self,
        job: &Job<UpdatePayload>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobExecutionError> {
        let payload = &job.payload;
        let mod_id = ModId::from_uuid(job.subject_id);
        let tracked = self
            .mods
            .find_mod(mod_id)
            .await?
            .ok_or_else(|| JobExecutionError::NotFound(format!("mod {mod_id}")))?;

        let report = JobReport {
            name: tracked.name.clone(),
            from_version: payload.from_version.clone(),
            to_version: Some(payload.to_version.clone()),
        };

        if tracked.current_version.as_deref() == Some(payload.to_version.as_str()) {
            info!(mod_id = %mod_id, version = %payload.to_version, "Mod already at target version");
            return Ok(report);
        }

        if tracked.current_version != payload.from_version {
            return Err(JobExecutionError::InvalidTransition(format!(
                "{} is at {}, expected {}",
                tracked.name,
                tracked.current_version.as_deref().unwrap_or("<none>"),
                payload.from_version.as_deref().unwrap_or("<none>"),
            )));
        }

        match self
            .catalog
            .version(&tracked.catalog_project_id, &payload.to_version, cancel)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(JobExecutionError::NotFound(format!(
                    "version {} of {} in catalog",
                    payload.to_version, tracked.catalog_project_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        if cancel.is_cancelled() {
            return Err(JobExecutionError::Interrupted);
        }
        self.mods
            .set_current_version(mod_id, &payload.to_version)
            .await?;

        Ok(report)
    }
}
