//! Catalog sync: refresh the newest available version of every mod on an
//! instance.
//!
//! Re-running after a crash overwrites `available_version` with the same or
//! newer data, so the job converges.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use modsync_client::CatalogSource;
use modsync_core::types::InstanceId;
use modsync_database::ModRegistry;
use modsync_entity::job::{Job, SyncPayload};

use crate::executor::{JobExecutionError, JobHandler, JobReport};

/// Handles catalog sync jobs.
#[derive(Debug)]
pub struct CatalogSyncHandler {
    catalog: Arc<dyn CatalogSource>,
    mods: Arc<dyn ModRegistry>,
}

impl CatalogSyncHandler {
    /// Create a new catalog sync handler
    pub fn new(catalog: Arc<dyn CatalogSource>, mods: Arc<dyn ModRegistry>) -> Self {
        Self { catalog, mods }
    }
}

#[async_trait]
impl JobHandler<SyncPayload> for CatalogSyncHandler {
    fn describe(&self, job: &Job<SyncPayload>) -> JobReport {
        JobReport {
            name: format!("instance {}", job.subject_id),
            from_version: None,
            to_version: None,
        }
    }

    async fn execute(
        &self,
        job: &Job<SyncPayload>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobExecutionError> {
        let instance_id = InstanceId::from_uuid(job.subject_id);
        let instance = self
            .mods
            .find_instance(instance_id)
            .await?
            .ok_or_else(|| JobExecutionError::NotFound(format!("instance {instance_id}")))?;

        let server_id = &job.payload.server_id;
        let mut updates = 0usize;
        for tracked in self.mods.list_mods(instance_id).await? {
            if cancel.is_cancelled() {
                return Err(JobExecutionError::Interrupted);
            }

            let latest = match self
                .catalog
                .latest_version(&tracked.catalog_project_id, server_id, cancel)
                .await
            {
                Ok(latest) => latest,
                Err(e) if e.is_not_found() => {
                    warn!(
                        mod_id = %tracked.id,
                        project = %tracked.catalog_project_id,
                        "Project no longer listed in catalog, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let available = latest.map(|v| v.version_number);
            if available != tracked.available_version {
                self.mods
                    .set_available_version(tracked.id, available.as_deref())
                    .await?;
            }
            if available.is_some() && available != tracked.current_version {
                updates += 1;
            }
            debug!(mod_id = %tracked.id, available = ?available, "Synced mod");
        }

        debug!(instance = %instance.name, updates, "Catalog sync finished");
        Ok(JobReport {
            name: instance.name,
            from_version: None,
            to_version: None,
        })
    }
}
