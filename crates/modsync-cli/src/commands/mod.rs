//! CLI command definitions and dispatch.

pub mod catalog;
pub mod jobs;
pub mod migrate;
pub mod mods;
pub mod recover;

use clap::{Parser, Subcommand, ValueEnum};

use modsync_core::config::AppConfig;
use modsync_core::error::AppError;
use modsync_database::DatabasePool;
use modsync_entity::job::JobKind;

use crate::output::OutputFormat;

/// ModSync: keep game-server mods in step with the remote catalog
#[derive(Debug, Parser)]
#[command(name = "modsync", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Submit, inspect and process jobs
    Jobs(jobs::JobsArgs),
    /// Requeue jobs orphaned by a crashed worker
    Recover,
    /// Inspect instances and tracked mods
    Mods(mods::ModsArgs),
    /// Query the remote catalog
    Catalog(catalog::CatalogArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Jobs(args) => jobs::execute(args, &self.config, self.format).await,
            Commands::Recover => recover::execute(&self.config, self.format).await,
            Commands::Mods(args) => mods::execute(args, &self.config, self.format).await,
            Commands::Catalog(args) => catalog::execute(args, &self.config, self.format).await,
        }
    }
}

/// Job kind as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Catalog sync jobs
    Sync,
    /// Mod update jobs
    Update,
}

impl From<KindArg> for JobKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sync => JobKind::Sync,
            KindArg::Update => JobKind::Update,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: connect to the job store database
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}
