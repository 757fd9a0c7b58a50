//! Remote catalog queries.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use modsync_client::{CatalogClient, CatalogSource};
use modsync_core::error::AppError;

use crate::output::{self, OutputFormat, or_dash};

/// Arguments for catalog commands
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Catalog subcommand
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Catalog subcommands
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Show a project
    Project {
        /// Catalog project id
        id: String,
    },
    /// List versions of a project compatible with a server
    Versions {
        /// Catalog project id
        id: String,
        /// Server identity
        #[arg(short, long)]
        server: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Published")]
    published: String,
}

/// Execute catalog commands
pub async fn execute(
    args: &CatalogArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let catalog = CatalogClient::from_config(&config.catalog)?;
    let cancel = CancellationToken::new();

    let result = match &args.command {
        CatalogCommand::Project { id } => catalog
            .project(id, &cancel)
            .await
            .map(|project| {
                output::print_item(
                    &project,
                    &[
                        ("ID", project.id.clone()),
                        ("Name", project.name.clone()),
                        ("Summary", or_dash(project.summary.as_deref())),
                    ],
                    format,
                );
            }),
        CatalogCommand::Versions { id, server } => {
            catalog.versions(id, server, &cancel).await.map(|mut versions| {
                versions.sort_by(|a, b| b.published_at.cmp(&a.published_at));
                let rows: Vec<VersionRow> = versions
                    .into_iter()
                    .map(|v| VersionRow {
                        published: v.published_at.format("%Y-%m-%d %H:%M").to_string(),
                        version: v.version_number,
                        id: v.id,
                    })
                    .collect();
                output::print_list(&rows, format);
            })
        }
    };

    catalog.client().shutdown();
    result.map_err(AppError::from)
}
