//! Orchestrator binary entry point
//!
//! Starts the HTTP API for the fine-tuning job platform with a
//! simulated training engine behind it.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_core::PlatformConfig;
use job_store::{ArtifactStore, JobStore};
use metrics_cache::MetricsCache;
use orchestrator::{JobOrchestrator, OrchestratorServer};
use training_engine::SimulatedEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orchestrator=info,job_store=info,training_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlatformConfig::default();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            format!("{}:{}", config.server.bind_address, config.server.port)
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000)))
        });

    let data_dir = config.storage.data_dir.clone();
    let store = Arc::new(JobStore::new(data_dir.join("jobs.json")));
    let artifacts = Arc::new(ArtifactStore::new(&data_dir));
    let metrics = Arc::new(MetricsCache::new());
    let engine = Arc::new(SimulatedEngine::new(
        artifacts.clone(),
        metrics.clone(),
        config.simulation.clone(),
    ));

    let service = Arc::new(JobOrchestrator::new(
        config,
        store,
        artifacts,
        metrics,
        engine,
    ));

    tracing::info!(%addr, "Starting orchestrator");

    OrchestratorServer::new(addr, service).run().await?;
    Ok(())
}
