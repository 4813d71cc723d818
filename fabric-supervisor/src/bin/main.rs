use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fabric_supervisor::{
    node_dir, replica_port, sibling_binary, storage_path, DEFAULT_NODE_COUNT, GRACE_PERIOD,
    ORCHESTRATOR_PORT,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::signal;
use tokio::time::interval;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fabric-supervisor")]
#[command(about = "Spawns a fabric's replicas and orchestrator, and shuts them down together")]
struct Cli {
    /// Number of replica nodes to start.
    #[arg(short = 'n', long = "nodes", default_value_t = DEFAULT_NODE_COUNT)]
    nodes: u16,
}

struct Supervised {
    name: String,
    child: Child,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    create_data_directories(cli.nodes)?;

    let mut supervised = Vec::new();

    for i in 0..cli.nodes {
        let port = replica_port(i);
        let name = format!("replica-{port}");
        match spawn_replica(port, i).await? {
            Some(mut child) => {
                forward_output(&mut child, &name);
                supervised.push(Supervised { name, child });
            }
            None => tracing::warn!(%name, "skipped: port already in use"),
        }
    }

    match spawn_orchestrator().await? {
        Some(mut child) => {
            let name = "orchestrator".to_string();
            forward_output(&mut child, &name);
            supervised.push(Supervised { name, child });
        }
        None => tracing::warn!("skipped orchestrator: port 6000 already in use"),
    }

    tracing::info!(
        replicas = supervised.len().saturating_sub(1),
        "fabric started; orchestrator at http://localhost:{ORCHESTRATOR_PORT}"
    );

    watch_until_shutdown(&mut supervised).await;
    shutdown_all(supervised).await;

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fabric_supervisor=info".parse().expect("static directive parses")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn create_data_directories(nodes: u16) -> Result<()> {
    for i in 0..nodes {
        let dir = node_dir(i);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }
    Ok(())
}

fn port_in_use(port: u16) -> bool {
    TcpStream::connect_timeout(
        &format!("127.0.0.1:{port}").parse().expect("valid socket addr"),
        Duration::from_millis(200),
    )
    .is_ok()
}

async fn spawn_replica(port: u16, index: u16) -> Result<Option<Child>> {
    if port_in_use(port) {
        return Ok(None);
    }

    let storage = storage_path(index);
    let binary = sibling_binary("fabric-replica")?;

    tracing::info!(port, storage = %storage.display(), "starting replica");

    let mut child = Command::new(binary)
        .arg("--port")
        .arg(port.to_string())
        .arg("--storage")
        .arg(&storage)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn replica on port {port}"))?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    if let Some(status) = child.try_wait()? {
        tracing::error!(port, %status, "replica exited immediately after start");
        return Ok(None);
    }

    Ok(Some(child))
}

async fn spawn_orchestrator() -> Result<Option<Child>> {
    if port_in_use(ORCHESTRATOR_PORT) {
        return Ok(None);
    }

    let binary = sibling_binary("fabric-orchestrator")?;
    tracing::info!("starting orchestrator");

    let mut child = Command::new(binary)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .context("failed to spawn orchestrator")?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    if let Some(status) = child.try_wait()? {
        tracing::error!(%status, "orchestrator exited immediately after start");
        return Ok(None);
    }

    Ok(Some(child))
}

/// Spawns background tasks that forward a child's stdout/stderr into this
/// process's own tracing output, prefixed with `name`. Takes the pipes out
/// of `child`, so this must run before the child is handed off elsewhere.
fn forward_output(child: &mut Child, name: &str) {
    if let Some(stdout) = child.stdout.take() {
        let name = name.to_string();
        let mut lines = BufReader::new(stdout).lines();
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::info!(target: "fabric_supervisor::child", "{name} stdout: {line}");
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let name = name.to_string();
        let mut lines = BufReader::new(stderr).lines();
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!(target: "fabric_supervisor::child", "{name} stderr: {line}");
            }
        });
    }
}

async fn watch_until_shutdown(supervised: &mut [Supervised]) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                return;
            }
            _ = ticker.tick() => {
                let mut any_alive = false;
                for s in supervised.iter_mut() {
                    match s.child.try_wait() {
                        Ok(Some(status)) => {
                            tracing::error!(name = %s.name, %status, "process terminated unexpectedly");
                        }
                        Ok(None) => any_alive = true,
                        Err(e) => tracing::error!(name = %s.name, error = %e, "error polling process"),
                    }
                }
                if !any_alive {
                    tracing::error!("all processes have terminated; exiting");
                    return;
                }
            }
        }
    }
}

async fn shutdown_all(supervised: Vec<Supervised>) {
    tracing::info!("shutting down fabric");

    for s in &supervised {
        terminate(&s.child, &s.name);
    }

    for mut s in supervised {
        match tokio::time::timeout(GRACE_PERIOD, s.child.wait()).await {
            Ok(_) => tracing::info!(name = %s.name, "process exited"),
            Err(_) => {
                tracing::warn!(name = %s.name, "process did not exit within grace period, killing");
                let _ = s.child.start_kill();
                let _ = s.child.wait().await;
            }
        }
    }

    tracing::info!("fabric shutdown complete");
}

#[cfg(unix)]
fn terminate(child: &Child, name: &str) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` came from this child's own `Child::id()`; sending it
        // SIGTERM is the standard graceful-shutdown request.
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            tracing::warn!(name, pid, "failed to send SIGTERM");
        }
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child, name: &str) {
    tracing::warn!(name, "graceful terminate unsupported on this platform, will rely on kill timeout");
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
