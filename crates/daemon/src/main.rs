// SPDX-License-Identifier: MIT

//! `claude-host`: runs the control plane (`serve`) or joins one as a
//! remote executor (`executor`).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chost_daemon::auth::HeaderAuthProvider;
use chost_daemon::executor_client::{self, ExecutorConfig};
use chost_daemon::{env, AppState};
use chost_engine::{ExecutorRegistry, LocalExecutor, SessionManager};
use chost_storage::FileMetadataStore;
use clap::{Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "claude-host", version, about = "Control plane for long-lived terminal/agent sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control plane: HTTP/WebSocket frontdoor plus the local executor.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Join a running control plane as a remote executor.
    Executor {
        /// Control plane WebSocket URL, e.g. ws://host:4317/ws/executor/control
        #[arg(long)]
        url: String,
        /// Executor key token (`chk_...`).
        #[arg(long)]
        token: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_delimiter = ',')]
        label: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let result = match cli.command {
        Command::Serve { port } => runtime.block_on(serve(port)),
        Command::Executor { url, token, id, name, label } => runtime.block_on(run_executor(url, token, id, name, label)),
    };

    if let Err(e) = &result {
        eprintln!("error: {e}");
    }
    result
}

async fn serve(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir)?;

    let _log_guard = setup_logging(&state_dir)?;
    info!("starting claude-host");

    let metadata = Arc::new(FileMetadataStore::open(state_dir.join("metadata.json"))?);
    let sessions_root = state_dir.join("sessions");
    std::fs::create_dir_all(&sessions_root)?;

    let local = Arc::new(LocalExecutor::new(
        Arc::new(chost_adapters::RealTmuxRunner::new()),
        Arc::new(chost_engine::TerminalBridge::new()),
        state_dir.join("rich"),
    ));
    let registry = ExecutorRegistry::with_timeouts(env::rpc_timeout(), env::heartbeat_timeout());
    registry.spawn_health_check(chost_core::time::now_secs);

    let session_manager = Arc::new(
        SessionManager::new(metadata, local, registry.clone(), sessions_root, env::admin_email())
            .with_abandon_threshold_secs(env::abandon_threshold_secs()),
    );
    let auth = Arc::new(HeaderAuthProvider);
    let state = AppState::new(session_manager, registry, auth, chost_core::time::now_secs());

    let port = env::port(port_override);
    let router = chost_daemon::build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
        })
        .await?;

    info!("daemon stopped");
    Ok(())
}

async fn run_executor(
    url: String,
    token: String,
    id: Option<String>,
    name: Option<String>,
    labels: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir)?;
    let _log_guard = setup_logging(&state_dir)?;

    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let name = name.unwrap_or_else(|| {
        hostname_fallback()
    });
    let labels: BTreeSet<String> = labels.into_iter().filter(|l| !l.is_empty()).collect();

    info!(executor_id = %id, %name, "joining control plane as executor");
    let config = ExecutorConfig { url, token, id, name, labels };
    if let Err(e) = executor_client::run(config, &state_dir).await {
        error!(error = %e, "executor session ended");
        return Err(e.into());
    }
    Ok(())
}

fn hostname_fallback() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "executor".to_string())
}

fn setup_logging(state_dir: &PathBuf) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = state_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "claude-host.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
