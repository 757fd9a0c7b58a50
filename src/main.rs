//! ModSync worker server
//!
//! Main entry point that wires the job engine together: recovery sweep,
//! worker pool, cron scheduler and catalog client.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use modsync_client::CatalogClient;
use modsync_core::config::AppConfig;
use modsync_core::error::AppError;
use modsync_database::DatabasePool;
use modsync_entity::job::{SyncPayload, UpdatePayload};
use modsync_worker::jobs::{CatalogSyncHandler, ModUpdateHandler};
use modsync_worker::{
    CronScheduler, JobPipeline, JobQueue, RecoverySweep, WorkerRunner, WorkerStores,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("MODSYNC_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ModSync v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    modsync_database::migration::run_migrations(db.pool()).await?;

    let stores = WorkerStores::from_database(&db);

    // ── Step 2: Requeue jobs orphaned by a previous crash ────────
    // Must finish before any worker polls, or a live job could be requeued.
    let recovered = RecoverySweep::new(stores.clone()).run().await?;
    tracing::info!(
        sync_jobs = recovered.sync_jobs.len(),
        update_jobs = recovered.update_jobs.len(),
        "Recovery sweep complete"
    );

    // ── Step 3: Catalog client ───────────────────────────────────
    let catalog = Arc::new(CatalogClient::from_config(&config.catalog)?);
    tracing::info!(base_url = %config.catalog.base_url, "Catalog client ready");

    // ── Step 4: Queue and pipelines ──────────────────────────────
    let queue = Arc::new(JobQueue::new(stores.clone()));
    let worker_id = config.worker.resolved_worker_id();

    let sync_pipeline = Arc::new(JobPipeline::<SyncPayload>::new(
        Arc::clone(&stores.sync_jobs),
        Arc::new(CatalogSyncHandler::new(
            catalog.clone(),
            Arc::clone(&stores.mods),
        )),
        Arc::clone(&stores.activity),
        worker_id.clone(),
    ));
    let update_pipeline = Arc::new(JobPipeline::<UpdatePayload>::new(
        Arc::clone(&stores.update_jobs),
        Arc::new(ModUpdateHandler::new(
            catalog.clone(),
            Arc::clone(&stores.mods),
        )),
        Arc::clone(&stores.activity),
        worker_id,
    ));

    let shutdown = CancellationToken::new();

    // ── Step 5: Background worker ────────────────────────────────
    let worker_handle = if config.worker.enabled {
        let runner = WorkerRunner::new(
            sync_pipeline,
            update_pipeline,
            config.worker.clone(),
            queue.waker(),
        );
        let worker_cancel = shutdown.clone();
        Some(tokio::spawn(async move {
            runner.run(worker_cancel).await;
        }))
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 6: Cron scheduler ───────────────────────────────────
    let scheduler = if config.scheduler.enabled {
        let scheduler = CronScheduler::new(Arc::clone(&queue), Arc::clone(&stores.mods)).await?;
        scheduler
            .register_catalog_sync(&config.scheduler.sync_cron)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Catalog sync schedule disabled");
        None
    };

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not stop cleanly");
        }
    }

    shutdown.cancel();
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker task panicked");
        }
    }

    catalog.client().shutdown();
    db.close().await;

    tracing::info!("ModSync shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
