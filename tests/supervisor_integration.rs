//! Subprocess lifecycle tests for the frontend supervisor.
//!
//! The frontend daemon is stood in for by throwaway `sh` scripts: the
//! supervisor appends `--logginglevel/--clientip/--clientport` after the
//! configured base args, so with `sh -c '<script>' agora-fe` those flags
//! arrive as `$1..$3` and the scripts can record or ignore them.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, timeout};

use agora::frontend::state::ReadinessState;
use agora::frontend::supervisor::{FrontendSupervisor, RestartPolicy, SupervisorConfig};

fn sh_config(script: &str, restart: RestartPolicy) -> SupervisorConfig {
    SupervisorConfig {
        binary: PathBuf::from("sh"),
        base_args: vec!["-c".to_string(), script.to_string(), "agora-fe".to_string()],
        client_ip: "127.0.0.1".to_string(),
        logging_level: 1,
        restart,
    }
}

/// Poll until `pred` holds or the deadline passes.
async fn wait_until<F: Fn() -> bool>(pred: F, deadline: Duration) -> bool {
    let result = timeout(deadline, async {
        while !pred() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    result.is_ok()
}

#[tokio::test]
async fn second_start_is_a_noop() {
    let state = ReadinessState::new();
    let config = sh_config("sleep 30", RestartPolicy::fixed(Duration::from_secs(10)));
    let supervisor = FrontendSupervisor::new(config, state.clone());

    assert!(supervisor.start_daemon(5000).expect("first start failed"));
    assert!(state.is_daemon_running());

    // Immediate second call: already running, no second subprocess.
    assert!(!supervisor.start_daemon(5000).expect("second start errored"));
    assert!(state.is_daemon_running());

    supervisor.shutdown().await;
    assert!(!state.is_daemon_running());
}

#[tokio::test]
async fn exit_clears_flag_and_relaunches_with_same_port() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("ports.txt");

    // Record the --clientport argument on every launch, then crash.
    let script = format!("echo \"$3\" >> {}; exit 1", out.display());
    let state = ReadinessState::new();
    let config = sh_config(&script, RestartPolicy::fixed(Duration::from_millis(150)));
    let supervisor = FrontendSupervisor::new(config, state.clone());

    assert!(supervisor.start_daemon(5000).expect("start failed"));

    // First run crashes and the flag clears while the relaunch delay runs.
    let launched = |n: usize| {
        let out = out.clone();
        move || {
            std::fs::read_to_string(&out)
                .map(|s| s.lines().count() >= n)
                .unwrap_or(false)
        }
    };
    assert!(wait_until(launched(1), Duration::from_secs(2)).await);
    assert!(
        wait_until(|| !state.is_daemon_running(), Duration::from_secs(2)).await,
        "running flag did not clear after exit"
    );

    // Exactly one relaunch per exit, with identical arguments.
    assert!(
        wait_until(launched(2), Duration::from_secs(2)).await,
        "no relaunch happened"
    );

    supervisor.shutdown().await;

    let recorded = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert!(lines.len() >= 2);
    for line in &lines {
        assert_eq!(*line, "--clientport=5000");
    }
    assert!(state.epoch() >= 2, "each exit should reset the handshake");
}

#[tokio::test]
async fn exit_resets_handshake_state() {
    let state = ReadinessState::new();
    state.mark_listener_ready(5000);

    // The child lives briefly so the handshake marks land before it exits.
    let config = sh_config("sleep 0.2; exit 1", RestartPolicy::fixed(Duration::from_secs(10)));
    let supervisor = FrontendSupervisor::new(config, state.clone());

    // Pretend this daemon lifetime completed the handshake.
    assert!(supervisor.start_daemon(5000).expect("start failed"));
    state.mark_frontend_ready("127.0.0.1", 45001);
    state.mark_conn_initialised();

    assert!(
        wait_until(|| !state.is_daemon_running(), Duration::from_secs(2)).await,
        "running flag did not clear"
    );
    let snapshot = state.snapshot();
    assert!(!snapshot.frontend_ready);
    assert!(!snapshot.conn_initialised);
    // Listener state survives.
    assert!(snapshot.listener_ready);
    assert_eq!(snapshot.listener_port, 5000);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn shutdown_suppresses_relaunch() {
    let state = ReadinessState::new();
    let config = sh_config("sleep 30", RestartPolicy::fixed(Duration::from_millis(100)));
    let supervisor = FrontendSupervisor::new(config, state.clone());

    assert!(supervisor.start_daemon(5000).expect("start failed"));
    supervisor.shutdown().await;
    assert!(!state.is_daemon_running());

    // Well past the restart delay, nothing has been relaunched.
    sleep(Duration::from_millis(400)).await;
    assert!(!state.is_daemon_running());
}
