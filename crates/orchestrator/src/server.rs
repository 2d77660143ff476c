//! HTTP server with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use job_core::Result;

use crate::http_api;
use crate::service::JobOrchestrator;

/// HTTP server wrapping the orchestrator service
pub struct OrchestratorServer {
    addr: SocketAddr,
    service: Arc<JobOrchestrator>,
}

impl OrchestratorServer {
    pub fn new(addr: SocketAddr, service: Arc<JobOrchestrator>) -> Self {
        Self { addr, service }
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let router = http_api::create_router(self.service);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(address = %self.addr, "Orchestrator API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!(error = %e, "Server error");
                job_core::Error::from(e)
            })?;

        info!("Orchestrator server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
