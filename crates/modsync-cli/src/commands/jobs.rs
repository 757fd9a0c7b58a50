//! Job submission, inspection and one-shot processing commands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use modsync_client::CatalogClient;
use modsync_core::config::AppConfig;
use modsync_core::error::AppError;
use modsync_core::types::{InstanceId, JobId, ModId};
use modsync_database::ModRegistry;
use modsync_entity::job::{EnqueueOutcome, JobKind, JobStatusView, SyncPayload, UpdatePayload};
use modsync_worker::jobs::{CatalogSyncHandler, ModUpdateHandler};
use modsync_worker::{IdempotencyKey, JobPipeline, JobQueue, RunSummary, WorkerStores};

use super::KindArg;
use crate::output::{self, OutputFormat, or_dash};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobsArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Request a catalog sync of an instance
    Sync {
        /// Instance id
        instance: InstanceId,
        /// Idempotency key; defaults to one shared by requests in the same minute
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Request a version change of a tracked mod
    Update {
        /// Mod id
        mod_id: ModId,
        /// Target version
        #[arg(short, long)]
        to: String,
        /// Expected current version; defaults to the recorded one
        #[arg(long)]
        from: Option<String>,
        /// Idempotency key from an earlier attempt of the same request
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Show the status of one job
    Status {
        /// Job kind
        #[arg(value_enum)]
        kind: KindArg,
        /// Job id
        id: i64,
    },
    /// List recent jobs for an instance or mod
    List {
        /// Job kind
        #[arg(value_enum)]
        kind: KindArg,
        /// Instance id (sync) or mod id (update)
        subject: Uuid,
        /// Maximum number of jobs
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show job counts per kind and status
    Stats,
    /// Run queued jobs once in this process, then exit
    Process {
        /// Only process this kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// Maximum number of jobs per kind
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Ended")]
    ended: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&JobStatusView> for JobRow {
    fn from(view: &JobStatusView) -> Self {
        Self {
            id: view.id.get(),
            kind: view.kind.to_string(),
            subject: view.subject_id.to_string(),
            status: view.status.to_string(),
            started: or_dash(view.started_at.as_ref().map(format_time)),
            ended: or_dash(view.ended_at.as_ref().map(format_time)),
            error: or_dash(view.error.as_deref()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct StatsRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Queued")]
    queued: i64,
    #[tabled(rename = "Running")]
    running: i64,
    #[tabled(rename = "Succeeded")]
    succeeded: i64,
    #[tabled(rename = "Failed")]
    failed: i64,
}

#[derive(Debug, Serialize)]
struct Submitted<'a> {
    job_id: i64,
    kind: JobKind,
    idempotency_key: &'a str,
    already_existed: bool,
}

/// Execute job commands
pub async fn execute(
    args: &JobsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let db = super::connect(&config).await?;
    let stores = WorkerStores::from_database(&db);
    let queue = JobQueue::new(stores.clone());

    let result = run(&args.command, &config, &stores, &queue, format).await;
    db.close().await;
    result
}

async fn run(
    command: &JobsCommand,
    config: &AppConfig,
    stores: &WorkerStores,
    queue: &JobQueue,
    format: OutputFormat,
) -> Result<(), AppError> {
    match command {
        JobsCommand::Sync { instance, key } => {
            let found = stores
                .mods
                .find_instance(*instance)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Instance {instance} not found")))?;
            let key = match key {
                Some(k) => IdempotencyKey::new(k.clone())?,
                None => IdempotencyKey::scheduled(*instance, Utc::now()),
            };
            let outcome = queue
                .enqueue_sync(
                    *instance,
                    &key,
                    SyncPayload {
                        server_id: found.server_id,
                    },
                )
                .await?;
            print_submitted(JobKind::Sync, &key, &outcome, format);
        }
        JobsCommand::Update {
            mod_id,
            to,
            from,
            key,
        } => {
            let tracked = stores
                .mods
                .find_mod(*mod_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Mod {mod_id} not found")))?;
            let key = match key {
                Some(k) => IdempotencyKey::new(k.clone())?,
                None => IdempotencyKey::for_update(*mod_id, to),
            };
            let payload = UpdatePayload {
                from_version: from.clone().or(tracked.current_version),
                to_version: to.clone(),
            };
            let outcome = queue.enqueue_update(*mod_id, &key, payload).await?;
            print_submitted(JobKind::Update, &key, &outcome, format);
        }
        JobsCommand::Status { kind, id } => {
            let view = queue.status((*kind).into(), JobId(*id)).await?;
            let row = JobRow::from(&view);
            output::print_item(
                &view,
                &[
                    ("ID", row.id.to_string()),
                    ("Kind", row.kind.clone()),
                    ("Subject", row.subject.clone()),
                    ("Status", row.status.clone()),
                    ("Started", row.started.clone()),
                    ("Ended", row.ended.clone()),
                    ("Error", row.error.clone()),
                ],
                format,
            );
        }
        JobsCommand::List {
            kind,
            subject,
            limit,
        } => {
            let views = queue.history((*kind).into(), *subject, *limit).await?;
            let rows: Vec<JobRow> = views.iter().map(JobRow::from).collect();
            output::print_list(&rows, format);
        }
        JobsCommand::Stats => {
            let stats = queue.stats().await?;
            let rows = [(JobKind::Sync, stats.sync), (JobKind::Update, stats.update)]
                .into_iter()
                .map(|(kind, s)| StatsRow {
                    kind: kind.to_string(),
                    queued: s.queued,
                    running: s.running,
                    succeeded: s.succeeded,
                    failed: s.failed,
                })
                .collect::<Vec<_>>();
            output::print_list(&rows, format);
        }
        JobsCommand::Process { kind, limit } => {
            let catalog = Arc::new(CatalogClient::from_config(&config.catalog)?);
            let worker_id = config.worker.resolved_worker_id();
            let cancel = CancellationToken::new();
            let wanted = |k: JobKind| kind.is_none_or(|arg| JobKind::from(arg) == k);

            if wanted(JobKind::Sync) {
                let pipeline = JobPipeline::<SyncPayload>::new(
                    Arc::clone(&stores.sync_jobs),
                    Arc::new(CatalogSyncHandler::new(
                        catalog.clone(),
                        Arc::clone(&stores.mods),
                    )),
                    Arc::clone(&stores.activity),
                    worker_id.clone(),
                );
                let summary = pipeline.run_queued(*limit, &cancel).await?;
                print_summary(JobKind::Sync, &summary);
            }
            if wanted(JobKind::Update) {
                let pipeline = JobPipeline::<UpdatePayload>::new(
                    Arc::clone(&stores.update_jobs),
                    Arc::new(ModUpdateHandler::new(
                        catalog.clone(),
                        Arc::clone(&stores.mods),
                    )),
                    Arc::clone(&stores.activity),
                    worker_id.clone(),
                );
                let summary = pipeline.run_queued(*limit, &cancel).await?;
                print_summary(JobKind::Update, &summary);
            }

            catalog.client().shutdown();
        }
    }

    Ok(())
}

fn print_submitted(
    kind: JobKind,
    key: &IdempotencyKey,
    outcome: &EnqueueOutcome,
    format: OutputFormat,
) {
    let submitted = Submitted {
        job_id: outcome.job_id.get(),
        kind,
        idempotency_key: key.as_str(),
        already_existed: outcome.already_existed,
    };
    match format {
        OutputFormat::Json => output::print_item(&submitted, &[], format),
        OutputFormat::Table => {
            if outcome.already_existed {
                output::print_warning(&format!(
                    "Request already submitted as {kind} job {}",
                    outcome.job_id
                ));
            } else {
                output::print_success(&format!("Enqueued {kind} job {}", outcome.job_id));
            }
            output::print_kv("Idempotency key", key.as_str());
        }
    }
}

fn print_summary(kind: JobKind, summary: &RunSummary) {
    println!("{kind} jobs:");
    output::print_kv("Succeeded", &summary.succeeded.to_string());
    output::print_kv("Failed", &summary.failed.to_string());
    output::print_kv("Skipped", &summary.skipped.to_string());
    output::print_kv("Interrupted", &summary.interrupted.to_string());
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
