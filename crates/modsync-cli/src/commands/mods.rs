//! Instance, tracked mod and activity commands.

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use modsync_core::error::AppError;
use modsync_core::types::{InstanceId, ModId};
use modsync_database::{ActivityLog, DatabasePool, ModRegistry};
use modsync_entity::catalog::{Instance, TrackedMod};

use crate::output::{self, OutputFormat, or_dash};

/// Arguments for mod commands
#[derive(Debug, Args)]
pub struct ModsArgs {
    /// Mods subcommand
    #[command(subcommand)]
    pub command: ModsCommand,
}

/// Mods subcommands
#[derive(Debug, Subcommand)]
pub enum ModsCommand {
    /// Register or rename an instance
    AddInstance {
        /// Display name
        name: String,
        /// Server identity used to pick compatible versions
        #[arg(short, long)]
        server: String,
        /// Reuse an existing id to rename the instance
        #[arg(long)]
        id: Option<InstanceId>,
    },
    /// Start tracking a catalog project on an instance
    Track {
        /// Owning instance
        instance: InstanceId,
        /// Catalog project id
        project: String,
        /// Display name; defaults to the project id
        #[arg(short, long)]
        name: Option<String>,
        /// Installed version, if any
        #[arg(long)]
        current: Option<String>,
    },
    /// List managed instances
    Instances,
    /// List tracked mods of an instance
    List {
        /// Instance id
        instance: InstanceId,
    },
    /// Show the activity log of an instance or mod
    Activity {
        /// Instance id or mod id
        subject: Uuid,
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct InstanceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Server")]
    server: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ModRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Update")]
    update: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ActivityRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Job")]
    job: i64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

/// Execute mod commands
pub async fn execute(
    args: &ModsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let db = super::connect(&config).await?;
    let result = run(&args.command, &db, format).await;
    db.close().await;
    result
}

async fn run(command: &ModsCommand, db: &DatabasePool, format: OutputFormat) -> Result<(), AppError> {
    let registry = db.mod_registry();

    match command {
        ModsCommand::AddInstance { name, server, id } => {
            let instance = Instance {
                id: id.unwrap_or_default(),
                name: name.clone(),
                server_id: server.clone(),
            };
            registry.upsert_instance(&instance).await?;
            output::print_success(&format!("Instance '{}' saved (id: {})", name, instance.id));
        }
        ModsCommand::Track {
            instance,
            project,
            name,
            current,
        } => {
            if registry.find_instance(*instance).await?.is_none() {
                return Err(AppError::not_found(format!("Instance {instance} not found")));
            }
            let tracked = TrackedMod {
                id: ModId::new(),
                instance_id: *instance,
                catalog_project_id: project.clone(),
                name: name.clone().unwrap_or_else(|| project.clone()),
                current_version: current.clone(),
                available_version: None,
                updated_at: Utc::now(),
            };
            registry.insert_mod(&tracked).await?;
            output::print_success(&format!(
                "Tracking '{}' on instance {} (id: {})",
                tracked.name, instance, tracked.id
            ));
        }
        ModsCommand::Instances => {
            let rows: Vec<InstanceRow> = registry
                .list_instances()
                .await?
                .into_iter()
                .map(|i| InstanceRow {
                    id: i.id.to_string(),
                    name: i.name,
                    server: i.server_id,
                })
                .collect();
            output::print_list(&rows, format);
        }
        ModsCommand::List { instance } => {
            let rows: Vec<ModRow> = registry
                .list_mods(*instance)
                .await?
                .into_iter()
                .map(|m| ModRow {
                    id: m.id.to_string(),
                    update: if m.has_update() { "yes" } else { "" }.to_string(),
                    name: m.name,
                    project: m.catalog_project_id,
                    current: or_dash(m.current_version),
                    available: or_dash(m.available_version),
                })
                .collect();
            output::print_list(&rows, format);
        }
        ModsCommand::Activity { subject, limit } => {
            let rows: Vec<ActivityRow> = db
                .activity_log()
                .list_for_subject(*subject, *limit)
                .await?
                .into_iter()
                .map(|e| ActivityRow {
                    when: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    job: e.job_id,
                    action: e.action,
                    name: e.name,
                    from: or_dash(e.from_version),
                    to: or_dash(e.to_version),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
