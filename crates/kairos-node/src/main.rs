//! Kairos node binary
//!
//! Accepts user operations over HTTP, executes the ones whose window is open
//! and runs the scheduler that executes the rest once their window opens.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cli::{Cli, LogFormat};
use config::{check_store_chains, NodeConfig};
use kairos_bundler::HttpBundler;
use kairos_metrics::Metrics;
use kairos_rpc::ApiServer;
use kairos_scheduler::{OperationIntake, RetryExecutor, Scheduler, SystemClock};
use kairos_storage::{MemoryStore, OperationStore, RocksStore};
use std::future::Future;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    tracing::info!("Kairos node starting...");

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            NodeConfig::load(path)?
        }
        None => NodeConfig::default(),
    };
    config.apply_cli(&cli);
    config.validate()?;

    let store = open_store(&cli, &config)?;
    check_store_chains(store.as_ref(), &config.chains).await?;

    let bundler = Arc::new(
        HttpBundler::new(config.bundler_endpoints()?).context("failed to build bundler client")?,
    );
    let metrics = Arc::new(Metrics::new());
    let clock = Arc::new(SystemClock);

    let executor = RetryExecutor::new(
        store.clone(),
        bundler.clone(),
        clock.clone(),
        config.retry_policy(),
    );
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        executor,
        clock.clone(),
        metrics.clone(),
        config.scheduler_config(),
    ));
    let intake = Arc::new(
        OperationIntake::new(
            store,
            bundler,
            clock,
            metrics.clone(),
            config.chains.iter().copied(),
        )
        .with_preflight_estimate(config.preflight_estimate),
    );

    let server = ApiServer::new(config.server_config(), intake, metrics);
    run_services(server, scheduler, shutdown_signal()).await?;

    tracing::info!("Kairos node stopped");

    Ok(())
}

/// Run the HTTP server and the scheduler until `signal` resolves or the
/// server stops on its own, then shut both down
async fn run_services<F>(server: ApiServer, scheduler: Arc<Scheduler>, signal: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server_shutdown = shutdown_rx.clone();
    let mut server_task = tokio::spawn(server.run(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    }));
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let server_result = tokio::select! {
        _ = signal => {
            tracing::info!("Shutdown signal received");
            None
        }
        result = &mut server_task => Some(result),
    };

    let _ = shutdown_tx.send(true);
    match server_result {
        Some(early) => {
            tracing::error!("HTTP server stopped, shutting down scheduler");
            scheduler_task.await.context("scheduler task failed")?;
            early
                .context("HTTP server task failed")?
                .context("HTTP server error")?;
            Err(anyhow!("HTTP server stopped unexpectedly"))
        }
        None => {
            scheduler_task.await.context("scheduler task failed")?;
            server_task
                .await
                .context("HTTP server task failed")?
                .context("HTTP server error")?;
            Ok(())
        }
    }
}

/// Resolves on ctrl-c, or on SIGTERM where supported
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Open the operation store selected by the command line
fn open_store(cli: &Cli, config: &NodeConfig) -> Result<Arc<dyn OperationStore>> {
    if cli.memory_store {
        tracing::warn!("Using in-memory store; deferred operations are lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }
    tracing::info!("Opening operation store at {:?}", config.datadir);
    let store = RocksStore::open(&config.datadir)
        .with_context(|| format!("failed to open store at {:?}", config.datadir))?;
    Ok(Arc::new(store))
}
