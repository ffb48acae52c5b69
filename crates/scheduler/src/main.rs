//! Namespace scheduler daemon
//!
//! Serves the up/down/state API that scales the workloads of whole
//! namespaces to zero and back.

use anyhow::{Context, Result};
use scheduler_lib::{
    api::{self, AppState},
    health::{components, ComponentHealth, HealthRegistry},
    observability::StructuredLogger,
    shutdown::{shutdown_channel, ShutdownTrigger},
    KubeClusterClient, NamespaceScheduler,
};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const SCHEDULER_VERSION: &str = env!("CARGO_PKG_VERSION");
const INSTANCE: &str = "ns-scheduler";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::SchedulerConfig::load()?;
    let target = config.cluster_target();
    info!(
        api_port = config.api_port,
        cluster = ?target,
        batch_size = config.default_batch_size,
        batch_interval_secs = config.default_batch_interval_secs,
        protected = config.enforce_protected_namespaces,
        "Scheduler configured"
    );

    let client = KubeClusterClient::connect(&target)
        .await
        .context("Failed to create Kubernetes client")?;

    let (trigger, shutdown) = shutdown_channel();
    let scheduler = NamespaceScheduler::builder(Arc::new(client))
        .guard(config.namespace_guard())
        .shutdown(shutdown.clone())
        .instance(INSTANCE)
        .build();

    let health_registry = HealthRegistry::new();
    let probe = scheduler.list_namespaces().await;
    match &probe {
        Ok(namespaces) => info!(count = namespaces.len(), "Cluster API reachable"),
        Err(e) => warn!(error = %e, "Cluster API probe failed"),
    }
    health_registry.record(components::CLUSTER_API, &probe).await;
    health_registry
        .update(components::SCHEDULER, ComponentHealth::healthy())
        .await;

    let logger = StructuredLogger::new(INSTANCE);
    logger.log_startup(SCHEDULER_VERSION, &format!("{:?}", target));

    let app_state = Arc::new(AppState::new(
        scheduler,
        health_registry,
        config.batch_policy(),
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, shutdown));

    run_until_stopped(api_handle, tokio::signal::ctrl_c(), trigger, &logger).await
}

/// Wait for `stop` or for the API server to end on its own, whichever comes
/// first. A stop request triggers shutdown and waits for the server to drain.
async fn run_until_stopped<F>(
    mut server: JoinHandle<std::io::Result<()>>,
    stop: F,
    trigger: ShutdownTrigger,
    logger: &StructuredLogger,
) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        joined = &mut server => {
            let result = joined
                .context("API server task panicked")?
                .context("API server failed");
            if let Err(e) = &result {
                error!(error = %format!("{:#}", e), "API server stopped");
            }
            result?;
            anyhow::bail!("API server stopped unexpectedly");
        }
        signal = stop => {
            signal.context("Failed to listen for SIGINT")?;
        }
    }

    logger.log_shutdown("SIGINT received");
    trigger.trigger();

    server
        .await
        .context("API server task panicked")?
        .context("API server failed")?;
    info!("Shutdown complete");

    Ok(())
}
