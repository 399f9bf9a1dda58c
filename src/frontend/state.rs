//! Shared readiness state for the startup handshake.
//!
//! Three actors race at startup: the client listener, the supervisor's
//! frontend daemon subprocess, and the gated consumer. This store is the
//! single record of how far the handshake has progressed, injected into
//! all three instead of living as ambient globals.
//!
//! Flags only move forward within one daemon lifetime; the sole reset is
//! [`ReadinessState::mark_daemon_stopped`], which also bumps the `epoch`
//! counter so connections from the previous lifetime can be recognised as
//! stale. Waiters observe the state through a watch channel rather than
//! polling on a timer.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One observation of the handshake progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandshakeSnapshot {
    /// The client listener is bound and accepting
    pub listener_ready: bool,
    /// Port the client listener accepts daemon pushes on
    pub listener_port: u16,
    /// The daemon reported its API server as reachable
    pub frontend_ready: bool,
    /// Loopback address the daemon's API server listens on
    pub frontend_address: String,
    /// Port the daemon's API server listens on
    pub frontend_port: u16,
    /// The consumer finished its bootstrap against the daemon
    pub conn_initialised: bool,
    /// A daemon subprocess is currently believed to be alive
    pub daemon_running: bool,
    /// Daemon lifetime counter; incremented on every reset
    pub epoch: u64,
}

/// Cheaply clonable handle to the shared handshake state.
///
/// Single-writer discipline: only the handshake paths (listener's ready
/// handler, supervisor, consumer bootstrap) call the setters; everything
/// else reads or waits.
#[derive(Debug, Clone)]
pub struct ReadinessState {
    tx: Arc<watch::Sender<HandshakeSnapshot>>,
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HandshakeSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current state. The snapshot is a copy; it does not track later
    /// updates.
    pub fn snapshot(&self) -> HandshakeSnapshot {
        self.tx.borrow().clone()
    }

    /// Observe every state change, for UI layers that render handshake
    /// progress.
    pub fn subscribe(&self) -> watch::Receiver<HandshakeSnapshot> {
        self.tx.subscribe()
    }

    /// Record the client listener as bound. Forward-only: a second call
    /// within the same process lifetime is ignored.
    pub fn mark_listener_ready(&self, port: u16) {
        self.tx.send_if_modified(|s| {
            if s.listener_ready {
                tracing::debug!(port, "listener already marked ready, ignoring");
                return false;
            }
            s.listener_ready = true;
            s.listener_port = port;
            true
        });
    }

    /// Record the daemon's API server address, reported through the
    /// listener's `FrontendReady` handler. Forward-only within one epoch.
    pub fn mark_frontend_ready(&self, address: impl Into<String>, port: u16) {
        let address = address.into();
        self.tx.send_if_modified(|s| {
            if s.frontend_ready {
                tracing::debug!(port, "frontend already marked ready, ignoring");
                return false;
            }
            s.frontend_ready = true;
            s.frontend_address = address;
            s.frontend_port = port;
            true
        });
    }

    /// Record the consumer's bootstrap as complete.
    pub fn mark_conn_initialised(&self) {
        self.tx.send_if_modified(|s| {
            if s.conn_initialised {
                return false;
            }
            s.conn_initialised = true;
            true
        });
    }

    /// Atomically claim the daemon slot. Returns false when a daemon is
    /// already marked running, in which case nothing changes.
    pub fn try_mark_daemon_running(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.daemon_running {
                return false;
            }
            s.daemon_running = true;
            true
        })
    }

    /// Full reset on daemon exit: clears the running flag and every
    /// frontend-side handshake field, and bumps the epoch. Listener fields
    /// survive since the local listener keeps running across daemon
    /// restarts.
    pub fn mark_daemon_stopped(&self) {
        self.tx.send_modify(|s| {
            s.daemon_running = false;
            s.frontend_ready = false;
            s.frontend_address.clear();
            s.frontend_port = 0;
            s.conn_initialised = false;
            s.epoch += 1;
        });
    }

    pub fn is_listener_ready(&self) -> bool {
        self.tx.borrow().listener_ready
    }

    pub fn listener_port(&self) -> u16 {
        self.tx.borrow().listener_port
    }

    pub fn is_frontend_ready(&self) -> bool {
        self.tx.borrow().frontend_ready
    }

    pub fn frontend_port(&self) -> u16 {
        self.tx.borrow().frontend_port
    }

    pub fn is_conn_initialised(&self) -> bool {
        self.tx.borrow().conn_initialised
    }

    pub fn is_daemon_running(&self) -> bool {
        self.tx.borrow().daemon_running
    }

    pub fn epoch(&self) -> u64 {
        self.tx.borrow().epoch
    }

    /// Resolves once the daemon has reported its API server address.
    /// Returns immediately if it already has.
    pub async fn wait_frontend_ready(&self) {
        let mut rx = self.tx.subscribe();
        // Cannot fail: the sender lives inside self for the whole await.
        let _ = rx.wait_for(|s| s.frontend_ready).await;
    }

    /// Resolves once the consumer bootstrap has completed.
    pub async fn wait_conn_initialised(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| s.conn_initialised).await;
    }

    /// Schedule `fut` to run once the connection is initialised. The
    /// future runs exactly once; if readiness never arrives it stays
    /// pending. There is no cancellation beyond dropping the returned
    /// handle's task.
    pub fn call_when_ready<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let state = self.clone();
        tokio::spawn(async move {
            state.wait_conn_initialised().await;
            fut.await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[test]
    fn starts_empty() {
        let state = ReadinessState::new();
        let snapshot = state.snapshot();
        assert_eq!(snapshot, HandshakeSnapshot::default());
    }

    #[test]
    fn listener_port_set_once() {
        let state = ReadinessState::new();
        state.mark_listener_ready(5000);
        state.mark_listener_ready(6000);
        assert_eq!(state.listener_port(), 5000);
    }

    #[test]
    fn frontend_ready_set_once_per_epoch() {
        let state = ReadinessState::new();
        state.mark_frontend_ready("127.0.0.1", 45001);
        state.mark_frontend_ready("127.0.0.1", 45002);
        assert_eq!(state.frontend_port(), 45001);

        // After a reset the field is writable again.
        state.mark_daemon_stopped();
        assert!(!state.is_frontend_ready());
        state.mark_frontend_ready("127.0.0.1", 45002);
        assert_eq!(state.frontend_port(), 45002);
    }

    #[test]
    fn daemon_slot_claimed_once() {
        let state = ReadinessState::new();
        assert!(state.try_mark_daemon_running());
        assert!(!state.try_mark_daemon_running());
        state.mark_daemon_stopped();
        assert!(state.try_mark_daemon_running());
    }

    #[test]
    fn reset_clears_frontend_fields_and_bumps_epoch() {
        let state = ReadinessState::new();
        state.mark_listener_ready(5000);
        assert!(state.try_mark_daemon_running());
        state.mark_frontend_ready("127.0.0.1", 45001);
        state.mark_conn_initialised();
        assert_eq!(state.epoch(), 0);

        state.mark_daemon_stopped();

        let snapshot = state.snapshot();
        assert!(!snapshot.daemon_running);
        assert!(!snapshot.frontend_ready);
        assert_eq!(snapshot.frontend_port, 0);
        assert!(!snapshot.conn_initialised);
        assert_eq!(snapshot.epoch, 1);
        // Listener state survives the reset.
        assert!(snapshot.listener_ready);
        assert_eq!(snapshot.listener_port, 5000);
    }

    #[tokio::test]
    async fn wait_resolves_when_marked() {
        let state = ReadinessState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_frontend_ready().await })
        };

        sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        state.mark_frontend_ready("127.0.0.1", 45001);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
    }

    #[tokio::test]
    async fn wait_resolves_immediately_when_already_ready() {
        let state = ReadinessState::new();
        state.mark_conn_initialised();
        timeout(Duration::from_millis(100), state.wait_conn_initialised())
            .await
            .expect("should resolve without any further state change");
    }

    #[tokio::test]
    async fn thunks_fire_exactly_once_and_never_early() {
        let state = ReadinessState::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let fired = fired.clone();
                state.call_when_ready(async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        // None may fire before readiness.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        state.mark_conn_initialised();
        for handle in handles {
            timeout(Duration::from_secs(1), handle)
                .await
                .expect("thunk timed out")
                .expect("thunk panicked");
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        // Nothing fires twice.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn thunk_registered_after_ready_fires() {
        let state = ReadinessState::new();
        state.mark_conn_initialised();
        let handle = state.call_when_ready(async { 7 });
        let value = timeout(Duration::from_secs(1), handle)
            .await
            .expect("thunk timed out")
            .expect("thunk panicked");
        assert_eq!(value, 7);
    }
}
