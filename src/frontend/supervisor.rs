//! Frontend daemon process supervisor.
//!
//! Launches the external frontend daemon with the client listener's
//! address and port on its command line, forwards the child's output into
//! the logging sink, and relaunches it whenever it exits. A daemon crash
//! is never fatal to the client; the relaunch loop runs until shutdown.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{Instant, sleep};

use crate::error::{AgoraError, Result};
use crate::frontend::state::ReadinessState;
use crate::models::FrontendSection;

/// Delay schedule between relaunch attempts.
///
/// The default is a fixed 10 second delay. `backoff` doubles the delay per
/// consecutive failure up to a cap; the failure count resets once the
/// child outlives the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    exponential: bool,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(10))
    }
}

impl RestartPolicy {
    /// The same delay after every exit.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            exponential: false,
        }
    }

    /// Doubling delay per consecutive failure, capped at `max`.
    pub fn backoff(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            exponential: true,
        }
    }

    /// Delay before the next relaunch given the number of consecutive
    /// failures so far.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if !self.exponential {
            return self.initial_delay;
        }
        let factor = 1u32 << consecutive_failures.min(16);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Uptime after which a run no longer counts as a consecutive failure.
    fn stable_uptime(&self) -> Duration {
        self.max_delay
    }
}

/// How to launch the frontend daemon.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Path to the daemon binary
    pub binary: PathBuf,
    /// Arguments placed before the connection flags (e.g. a subcommand)
    pub base_args: Vec<String>,
    /// Address advertised to the daemon for the client listener
    pub client_ip: String,
    /// Verbosity forwarded via --logginglevel
    pub logging_level: u8,
    pub restart: RestartPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::from_section(&FrontendSection::default())
    }
}

impl SupervisorConfig {
    pub fn from_section(section: &FrontendSection) -> Self {
        Self {
            binary: section.binary.clone(),
            base_args: section.base_args.clone(),
            client_ip: section.client_ip.clone(),
            logging_level: section.logging_level,
            restart: RestartPolicy::fixed(Duration::from_secs(section.restart_delay_secs)),
        }
    }
}

/// Owns the frontend daemon subprocess lifecycle.
///
/// Cheaply clonable handle: clones share the readiness state and the
/// shutdown channel, so the monitor tasks it spawns keep working no
/// matter which clone requested the launch.
#[derive(Clone)]
pub struct FrontendSupervisor {
    config: SupervisorConfig,
    state: ReadinessState,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl FrontendSupervisor {
    pub fn new(config: SupervisorConfig, state: ReadinessState) -> Self {
        let (shutdown_tx, _rx) = watch::channel(false);
        Self {
            config,
            state,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Launch the frontend daemon, telling it to report back to the
    /// client listener at `listener_port`.
    ///
    /// Returns `Ok(false)` without side effects when a daemon is already
    /// marked running. On success a monitor task tracks the child and
    /// relaunches it with the same port when it exits.
    pub fn start_daemon(&self, listener_port: u16) -> Result<bool> {
        if !self.state.try_mark_daemon_running() {
            tracing::info!("frontend daemon already running, skipping start");
            return Ok(false);
        }

        tracing::info!(
            binary = %self.config.binary.display(),
            listener_port,
            "starting frontend daemon"
        );

        match self.spawn_child(listener_port) {
            Ok(child) => {
                let supervisor = self.clone();
                tokio::spawn(supervisor.monitor(child, listener_port, 0));
                Ok(true)
            }
            Err(e) => {
                self.state.mark_daemon_stopped();
                Err(e)
            }
        }
    }

    /// Stop supervising: kill the child and suppress relaunching. Waits
    /// briefly for the running flag to clear.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut rx = self.state.subscribe();
        let _ = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| !s.daemon_running),
        )
        .await;
    }

    fn spawn_child(&self, listener_port: u16) -> Result<Child> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(&self.config.base_args)
            .arg(format!("--logginglevel={}", self.config.logging_level))
            .arg(format!("--clientip={}", self.config.client_ip))
            .arg(format!("--clientport={}", listener_port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            AgoraError::Supervisor(format!(
                "failed to spawn frontend daemon {:?}: {}",
                self.config.binary, e
            ))
        })
    }

    /// Track one child until it exits or shutdown is requested, then
    /// handle the relaunch schedule.
    ///
    /// Returns an explicitly boxed `Send` future rather than an `async fn`
    /// so that the mutual recursion with [`Self::relaunch`] (which spawns
    /// `monitor`) has no opaque return types in the cycle, which the
    /// compiler cannot resolve `Send` through.
    fn monitor(
        self,
        mut child: Child,
        listener_port: u16,
        failures: u32,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(forward_output(stdout, false));
            }
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(forward_output(stderr, true));
            }

            let started = Instant::now();
            let mut shutdown_rx = self.shutdown_tx.subscribe();

            let exit = tokio::select! {
                status = child.wait() => Some(status),
                _ = shutdown_rx.wait_for(|stop| *stop) => None,
            };

            let Some(status) = exit else {
                tracing::info!("shutdown requested, stopping frontend daemon");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill frontend daemon");
                }
                self.state.mark_daemon_stopped();
                return;
            };

            self.state.mark_daemon_stopped();

            match status {
                Ok(status) => tracing::warn!(
                    code = ?status.code(),
                    "frontend daemon exited"
                ),
                Err(e) => tracing::warn!(error = %e, "failed to await frontend daemon"),
            }

            let failures = if started.elapsed() >= self.config.restart.stable_uptime() {
                0
            } else {
                failures.saturating_add(1)
            };

            self.relaunch(listener_port, failures).await;
        })
    }

    /// Sleep out the restart delay, then start the daemon again with the
    /// same listener port. Spawn failures are retried indefinitely.
    ///
    /// Returns an explicitly boxed `Send` future; see [`Self::monitor`].
    fn relaunch(
        self,
        listener_port: u16,
        mut failures: u32,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            loop {
                let delay = self.config.restart.delay_for(failures);
                tracing::info!(
                    delay_secs = delay.as_secs_f64(),
                    "will relaunch frontend daemon"
                );

                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown_rx.wait_for(|stop| *stop) => {
                        tracing::info!("shutdown requested, abandoning relaunch");
                        return;
                    }
                }

                if !self.state.try_mark_daemon_running() {
                    tracing::info!("frontend daemon already running, abandoning relaunch");
                    return;
                }

                tracing::info!(listener_port, "relaunching frontend daemon");
                match self.spawn_child(listener_port) {
                    Ok(child) => {
                        tokio::spawn(self.monitor(child, listener_port, failures));
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "relaunch failed");
                        self.state.mark_daemon_stopped();
                        failures = failures.saturating_add(1);
                    }
                }
            }
        })
    }
}

/// Forward one of the child's output streams into the tracing sink,
/// line by line.
async fn forward_output<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            tracing::warn!(target: "frontend", "{}", line);
        } else {
            tracing::info!(target: "frontend", "{}", line);
        }
    }
}
