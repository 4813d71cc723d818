use std::sync::Arc;

use anyhow::{Context, Result};
use fabric_orchestrator::Orchestrator;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MIN_CONSENSUS: usize = 3;
const DEFAULT_REPLICA_PORTS: [u16; 7] = [5001, 5002, 5003, 5004, 5005, 5006, 5007];

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let replica_urls = replica_urls_from_env();
    let min_consensus = min_consensus_from_env();

    tracing::info!(
        replicas = replica_urls.len(),
        min_consensus,
        "starting orchestrator"
    );

    let orchestrator = Arc::new(Orchestrator::new(replica_urls, min_consensus).await);

    let app = fabric_orchestrator::router(orchestrator);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:6000")
        .await
        .context("failed to bind port 6000")?;

    tracing::info!("orchestrator listening on 0.0.0.0:6000");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("orchestrator shut down");
    Ok(())
}

fn replica_urls_from_env() -> Vec<String> {
    match std::env::var("FABRIC_REPLICA_URLS") {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => DEFAULT_REPLICA_PORTS
            .iter()
            .map(|port| format!("http://localhost:{port}"))
            .collect(),
    }
}

fn min_consensus_from_env() -> usize {
    std::env::var("FABRIC_MIN_CONSENSUS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_MIN_CONSENSUS)
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fabric_orchestrator=info".parse().expect("static directive parses")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
