//! Agora client process - supervises the frontend daemon and brokers the
//! startup handshake.
//!
//! On start it:
//! - Binds the client API listener on a loopback port
//! - Launches the frontend daemon with that port on its command line
//! - Bootstraps the gated consumer once the daemon reports ready
//! - Serves daemon pushes into the view store until SIGTERM/SIGINT
//!
//! ## Files
//!
//! - `~/.agora/config.toml` - client configuration
//! - `~/.agora/logs/client.log` - rolling log file

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::select;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing_appender::non_blocking::WorkerGuard;

use agora::frontend::listener::{AmbientSink, ClientApiListener};
use agora::frontend::state::ReadinessState;
use agora::frontend::supervisor::{FrontendSupervisor, SupervisorConfig};
use agora::frontend::FrontendClient;
use agora::services::ViewStore;
use agora::services::global_config;

#[derive(Parser, Debug)]
#[command(name = "agora", version, about = "Client coordination core for a federated discussion network")]
struct Args {
    /// Path to the frontend daemon binary (overrides config)
    #[arg(long, env = "AGORA_FRONTEND_BIN")]
    frontend_bin: Option<PathBuf>,

    /// Verbosity forwarded to the frontend daemon
    #[arg(long)]
    logging_level: Option<u8>,

    /// Seconds between frontend daemon relaunch attempts
    #[arg(long)]
    restart_delay_secs: Option<u64>,

    /// Do not spawn the frontend daemon; wait for an externally managed
    /// one to report in
    #[arg(long)]
    no_spawn: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_dir = global_config::config_dir()?;
    std::fs::create_dir_all(&config_dir)?;
    let _guard = init_logging(&global_config::logs_dir()?)?;

    tracing::info!("agora client starting, version {}", env!("CARGO_PKG_VERSION"));

    let mut config = global_config::load_or_default()?;
    if let Some(bin) = args.frontend_bin {
        config.frontend.binary = bin;
    }
    if let Some(level) = args.logging_level {
        config.frontend.logging_level = level;
    }
    if let Some(secs) = args.restart_delay_secs {
        config.frontend.restart_delay_secs = secs;
    }

    let state = ReadinessState::new();
    let store = Arc::new(ViewStore::default());

    // Listener first: the daemon needs our port on its command line.
    let listener = ClientApiListener::bind().await?;
    let listener_port = listener.port();
    state.mark_listener_ready(listener_port);

    {
        let state = state.clone();
        let sink: Arc<dyn AmbientSink> = store.clone();
        tokio::spawn(async move {
            if let Err(e) = listener.serve(state, sink).await {
                tracing::error!(error = %e, "client API listener failed");
            }
        });
    }

    let supervisor = FrontendSupervisor::new(
        SupervisorConfig::from_section(&config.frontend),
        state.clone(),
    );
    if args.no_spawn {
        tracing::info!("--no-spawn set, waiting for an external frontend daemon");
    } else {
        supervisor.start_daemon(listener_port)?;
    }

    // Bootstrap the consumer as soon as the daemon reports in, and pull
    // the initial board list so the UI has something to render.
    let client = Arc::new(FrontendClient::new(state.clone()));
    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            if let Err(e) = client.initialise().await {
                tracing::warn!(error = %e, "frontend bootstrap failed");
                return;
            }
            match client.get_all_boards().await {
                Ok(boards) => tracing::info!(count = boards.len(), "initial board list loaded"),
                Err(e) => tracing::warn!(error = %e, "initial board fetch failed"),
            }
        });
    }

    wait_for_shutdown_signal().await?;

    supervisor.shutdown().await;
    tracing::info!("agora client shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down..."),
    }
    Ok(())
}

#[cfg(windows)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down...");
    Ok(())
}

/// Initialize logging with a daily-rolling file appender plus stdout.
///
/// The returned `WorkerGuard` must be kept alive for the duration of the
/// program so buffered log lines get flushed.
fn init_logging(log_dir: &std::path::Path) -> anyhow::Result<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(guard)
}
