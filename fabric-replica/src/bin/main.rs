use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fabric_ledger::Ledger;
use fabric_replica::ReplicaService;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fabric-replica")]
#[command(about = "One ledger replica, exposed over HTTP")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 5001)]
    port: u16,

    /// Path to this replica's ledger file.
    #[arg(long, default_value = "blockchain_dag.json")]
    storage: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let ledger = Ledger::open(&cli.storage)
        .with_context(|| format!("failed to open ledger at {}", cli.storage))?;
    let service = Arc::new(ReplicaService::new(ledger));

    let app = fabric_replica::router(service);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cli.port))
        .await
        .with_context(|| format!("failed to bind port {}", cli.port))?;

    tracing::info!(port = cli.port, storage = %cli.storage, "replica listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("replica shut down");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(
            "fabric_replica=info,fabric_ledger=info,fabric_types=info"
                .parse()
                .expect("static directive parses"),
        ))
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
