//! Client API listener: the loopback server the frontend daemon calls
//! into.
//!
//! The listener exists so the daemon can complete the handshake (it has
//! to tell a freshly started client where its own API server ended up)
//! and push ambient data afterwards. It binds an OS-assigned port; the
//! supervisor passes that port to the daemon on its command line.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::error::{AgoraError, Result};
use crate::frontend::protocol::{ClientOp, Request, Response, read_message, write_message};
use crate::frontend::state::ReadinessState;
use crate::models::{
    AmbientBoard, AmbientLocalUserPayload, AmbientStatusPayload, CompiledThread,
    NotificationsPayload,
};

/// Receiver for data the frontend daemon pushes at the client.
///
/// The UI layer implements this; each method replaces one piece of view
/// state. Implementations must not block: handlers run on the listener's
/// connection tasks. [`crate::services::ViewStore`] is the bundled
/// latest-value implementation.
pub trait AmbientSink: Send + Sync {
    fn deliver_ambients(&self, boards: Vec<AmbientBoard>);
    fn ambient_status(&self, status: AmbientStatusPayload);
    fn ambient_local_user(&self, payload: AmbientLocalUserPayload);
    fn home_view(&self, threads: Vec<CompiledThread>);
    fn popular_view(&self, threads: Vec<CompiledThread>);
    fn notifications(&self, payload: NotificationsPayload);
    fn onboard_complete(&self, complete: bool);
    fn mod_mode_enabled(&self, enabled: bool);
}

/// Loopback TCP listener serving [`ClientOp`] requests from the daemon.
pub struct ClientApiListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ClientApiListener {
    /// Bind on 127.0.0.1 with an OS-assigned port.
    pub async fn bind() -> Result<Self> {
        Self::bind_addr("127.0.0.1:0").await
    }

    /// Bind on a specific address, for callers that pin the interface.
    pub async fn bind_addr(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            AgoraError::FrontendConnection(format!("failed to bind client listener on {addr}: {e}"))
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The port the daemon should push into.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve connections until the listener task is dropped.
    /// Each connection gets its own task; a failed connection is logged
    /// and dropped without affecting the others.
    pub async fn serve(self, state: ReadinessState, sink: Arc<dyn AmbientSink>) -> Result<()> {
        tracing::info!(port = self.port(), "client API listener accepting");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let state = state.clone();
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state, sink).await {
                            tracing::warn!(%peer, error = %e, "client API connection error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "client API accept error");
                }
            }
        }
    }
}

/// Serve one daemon connection: a loop of framed requests, each answered
/// in order on the same stream.
async fn handle_connection(
    mut stream: TcpStream,
    state: ReadinessState,
    sink: Arc<dyn AmbientSink>,
) -> Result<()> {
    loop {
        let request: Request<ClientOp> = match read_message(&mut stream).await {
            Ok(request) => request,
            Err(_) => return Ok(()), // connection closed
        };

        let response = dispatch(request.id, request.op, &state, sink.as_ref());
        write_message(&mut stream, &response)
            .await
            .map_err(|e| AgoraError::FrontendProtocol(format!("failed to send response: {e}")))?;
    }
}

fn dispatch(id: u64, op: ClientOp, state: &ReadinessState, sink: &dyn AmbientSink) -> Response {
    match op {
        ClientOp::FrontendReady { address, port } => {
            tracing::info!(%address, port, "frontend daemon reported ready");
            state.mark_frontend_ready(address, port);
            Response::ok_empty(id)
        }
        ClientOp::DeliverAmbients { boards } => {
            sink.deliver_ambients(boards);
            Response::ok_empty(id)
        }
        ClientOp::AmbientStatus(status) => {
            sink.ambient_status(status);
            Response::ok_empty(id)
        }
        ClientOp::AmbientLocalUser(payload) => {
            sink.ambient_local_user(payload);
            Response::ok_empty(id)
        }
        ClientOp::HomeView { threads } => {
            sink.home_view(threads);
            Response::ok_empty(id)
        }
        ClientOp::PopularView { threads } => {
            sink.popular_view(threads);
            Response::ok_empty(id)
        }
        ClientOp::Notifications(payload) => {
            sink.notifications(payload);
            Response::ok_empty(id)
        }
        ClientOp::OnboardComplete { complete } => {
            sink.onboard_complete(complete);
            Response::ok_empty(id)
        }
        ClientOp::ModModeEnabled { enabled } => {
            sink.mod_mode_enabled(enabled);
            Response::ok_empty(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ViewStore;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    async fn start_listener() -> (u16, ReadinessState, Arc<ViewStore>) {
        let listener = ClientApiListener::bind().await.unwrap();
        let port = listener.port();
        let state = ReadinessState::new();
        let store = Arc::new(ViewStore::default());
        let serve_state = state.clone();
        let serve_store: Arc<dyn AmbientSink> = store.clone();
        tokio::spawn(listener.serve(serve_state, serve_store));
        (port, state, store)
    }

    async fn send_op(stream: &mut TcpStream, id: u64, op: ClientOp) -> Response {
        write_message(stream, &Request::new(id, op)).await.unwrap();
        read_message(stream).await.unwrap()
    }

    #[tokio::test]
    async fn bind_assigns_a_port() {
        let listener = ClientApiListener::bind().await.unwrap();
        assert_ne!(listener.port(), 0);
        assert!(listener.local_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn frontend_ready_updates_state() {
        let (port, state, _store) = start_listener().await;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let response = send_op(
            &mut stream,
            1,
            ClientOp::FrontendReady {
                address: "127.0.0.1".to_string(),
                port: 45001,
            },
        )
        .await;

        assert!(response.ok);
        assert_eq!(response.id, 1);
        assert!(state.is_frontend_ready());
        assert_eq!(state.frontend_port(), 45001);
    }

    #[tokio::test]
    async fn pushes_land_in_sink() {
        let (port, _state, store) = start_listener().await;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let response = send_op(
            &mut stream,
            1,
            ClientOp::HomeView {
                threads: vec![CompiledThread {
                    fingerprint: "thread-1".to_string(),
                    ..Default::default()
                }],
            },
        )
        .await;
        assert!(response.ok);

        let response = send_op(&mut stream, 2, ClientOp::OnboardComplete { complete: true }).await;
        assert!(response.ok);

        assert_eq!(store.home_threads().len(), 1);
        assert_eq!(store.home_threads()[0].fingerprint, "thread-1");
        assert!(store.is_onboard_complete());
    }

    #[tokio::test]
    async fn multiple_requests_on_one_connection() {
        let (port, state, store) = start_listener().await;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        for id in 1..=3u64 {
            let response = send_op(
                &mut stream,
                id,
                ClientOp::DeliverAmbients {
                    boards: vec![AmbientBoard {
                        fingerprint: format!("board-{id}"),
                        ..Default::default()
                    }],
                },
            )
            .await;
            assert!(response.ok);
            assert_eq!(response.id, id);
        }

        assert_eq!(store.ambient_boards().len(), 1);
        assert_eq!(store.ambient_boards()[0].fingerprint, "board-3");
        assert!(!state.is_frontend_ready());
    }

    #[tokio::test]
    async fn concurrent_connections_are_served() {
        let (port, _state, store) = start_listener().await;

        let mut handles = Vec::new();
        for i in 0..5u64 {
            handles.push(tokio::spawn(async move {
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                send_op(&mut stream, i, ClientOp::ModModeEnabled { enabled: true }).await
            }));
        }

        for handle in handles {
            let response = timeout(Duration::from_secs(2), handle)
                .await
                .expect("connection timed out")
                .expect("connection task panicked");
            assert!(response.ok);
        }
        assert!(store.is_mod_mode_enabled());
    }
}
