//! Gated frontend API consumer.
//!
//! Every data call into the frontend daemon goes through [`FrontendClient`].
//! Calls issued before the handshake completes simply wait: they suspend on
//! the readiness state until the daemon has reported its address, then the
//! first caller through performs the one-time bootstrap (connect, register
//! the client listener's port) while any concurrent callers queue on the
//! connection lock and observe the completed state.
//!
//! Ordering between concurrently pending calls is unspecified; calls are
//! independent reads or writes, not sequenced transactions. A transport
//! failure is returned to the caller and drops the connection; the call is
//! not retried. "Not ready yet" is never an error.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AgoraError, Result};
use crate::frontend::protocol::{FrontendOp, Request, Response, read_message, write_message};
use crate::frontend::state::{HandshakeSnapshot, ReadinessState};
use crate::models::{
    BoardAndThreads, BoardContent, BoardSignalRequest, CompiledBoard, ContentEventPayload,
    EntityByKeyRequest, Event, PostContent, SignalEventPayload, SignalKind, ThreadAndPosts,
    ThreadContent, UncompiledEntities, UserAndGraph, UserContent, UserViewRequest,
};

/// A live connection to the daemon, tagged with the daemon lifetime it
/// belongs to so it can be discarded after a restart.
struct FrontendConn {
    stream: TcpStream,
    epoch: u64,
}

/// Client for the frontend daemon's API, gated behind the readiness
/// handshake.
pub struct FrontendClient {
    state: ReadinessState,
    conn: Mutex<Option<FrontendConn>>,
    request_id: AtomicU64,
}

impl FrontendClient {
    pub fn new(state: ReadinessState) -> Self {
        Self {
            state,
            conn: Mutex::new(None),
            request_id: AtomicU64::new(1),
        }
    }

    /// Perform the one-time connection bootstrap if it has not happened
    /// yet for the current daemon lifetime.
    ///
    /// Waits for the daemon to report ready, connects, and registers the
    /// client listener's port so the daemon can push back. Concurrent
    /// callers share a single bootstrap; later callers only observe the
    /// already-initialised connection.
    pub async fn initialise(&self) -> Result<()> {
        let _guard = self.locked_conn().await?;
        Ok(())
    }

    /// Lock the connection slot, dropping a connection from a previous
    /// daemon lifetime and bootstrapping if the slot is empty.
    async fn locked_conn(&self) -> Result<MutexGuard<'_, Option<FrontendConn>>> {
        self.state.wait_frontend_ready().await;
        let mut guard = self.conn.lock().await;
        let snapshot = self.state.snapshot();

        if guard
            .as_ref()
            .is_some_and(|conn| conn.epoch != snapshot.epoch)
        {
            tracing::debug!("dropping connection from a previous frontend lifetime");
            *guard = None;
        }

        if guard.is_none() {
            *guard = Some(self.bootstrap(&snapshot).await?);
            self.state.mark_conn_initialised();
        }

        Ok(guard)
    }

    /// Open the transport and register ourselves with the daemon.
    async fn bootstrap(&self, snapshot: &HandshakeSnapshot) -> Result<FrontendConn> {
        let addr = format!("{}:{}", snapshot.frontend_address, snapshot.frontend_port);
        let mut stream = TcpStream::connect(&addr).await.map_err(|e| {
            AgoraError::FrontendConnection(format!(
                "failed to connect to frontend daemon at {addr}: {e}"
            ))
        })?;

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(
            id,
            FrontendOp::RegisterClientPort {
                port: snapshot.listener_port,
            },
        );
        write_message(&mut stream, &request).await.map_err(|e| {
            AgoraError::FrontendProtocol(format!("failed to send registration: {e}"))
        })?;
        let response: Response = read_message(&mut stream).await.map_err(|e| {
            AgoraError::FrontendProtocol(format!("failed to read registration response: {e}"))
        })?;
        if !response.ok {
            return Err(AgoraError::FrontendRemote(
                response
                    .error
                    .unwrap_or_else(|| "registration rejected".to_string()),
            ));
        }

        tracing::info!(%addr, "frontend connection initialised");
        Ok(FrontendConn {
            stream,
            epoch: snapshot.epoch,
        })
    }

    /// Send one request and wait for its response. The connection is
    /// dropped on any transport error so the next call reconnects.
    async fn request(&self, op: FrontendOp) -> Result<Response> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.locked_conn().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(AgoraError::FrontendConnection(
                "connection slot empty after bootstrap".to_string(),
            ));
        };

        let request = Request::new(id, op);
        if let Err(e) = write_message(&mut conn.stream, &request).await {
            *guard = None;
            return Err(AgoraError::FrontendProtocol(format!(
                "failed to send request: {e}"
            )));
        }

        let response: Response = match read_message(&mut conn.stream).await {
            Ok(response) => response,
            Err(e) => {
                *guard = None;
                return Err(AgoraError::FrontendProtocol(format!(
                    "failed to read response: {e}"
                )));
            }
        };

        if response.id != id {
            return Err(AgoraError::FrontendProtocol(format!(
                "response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        Ok(response)
    }

    /// All known boards.
    pub async fn get_all_boards(&self) -> Result<Vec<CompiledBoard>> {
        decode(self.request(FrontendOp::GetAllBoards).await?)
    }

    /// One board plus its threads.
    pub async fn get_board_and_threads(&self, board_fingerprint: &str) -> Result<BoardAndThreads> {
        decode(
            self.request(FrontendOp::GetBoardAndThreads {
                board_fingerprint: board_fingerprint.to_string(),
            })
            .await?,
        )
    }

    /// One thread plus its posts.
    pub async fn get_thread_and_posts(
        &self,
        board_fingerprint: &str,
        thread_fingerprint: &str,
    ) -> Result<ThreadAndPosts> {
        decode(
            self.request(FrontendOp::GetThreadAndPosts {
                board_fingerprint: board_fingerprint.to_string(),
                thread_fingerprint: thread_fingerprint.to_string(),
            })
            .await?,
        )
    }

    /// A user plus the requested parts of their content graph.
    pub async fn get_user_and_graph(&self, request: UserViewRequest) -> Result<UserAndGraph> {
        decode(self.request(FrontendOp::GetUserAndGraph(request)).await?)
    }

    /// Page of raw entities for diagnostic views.
    pub async fn get_uncompiled_entities(
        &self,
        request: EntityByKeyRequest,
    ) -> Result<UncompiledEntities> {
        decode(
            self.request(FrontendOp::GetUncompiledEntityByKey(request))
                .await?,
        )
    }

    /// Write back per-board subscription state.
    pub async fn set_board_signal(&self, request: BoardSignalRequest) -> Result<()> {
        expect_ok(self.request(FrontendOp::SetBoardSignal(request)).await?)
    }

    /// Create or edit a user-owned entity.
    pub async fn send_content_event(&self, payload: ContentEventPayload) -> Result<()> {
        expect_ok(self.request(FrontendOp::SendContentEvent(payload)).await?)
    }

    /// Cast a vote / report / mod action / trust signal.
    pub async fn send_signal_event(&self, payload: SignalEventPayload) -> Result<()> {
        expect_ok(self.request(FrontendOp::SendSignalEvent(payload)).await?)
    }

    /// Ask the daemon to drop completed inflight entries.
    pub async fn prune_inflights(&self) -> Result<()> {
        expect_ok(self.request(FrontendOp::PruneInflights).await?)
    }

    // ========================================================================
    // Signal actions
    // ========================================================================

    // Votes aggregate; an upvote cannot be retracted, only reversed by a
    // downvote. Mod reports stay individual and retractable.

    pub async fn upvote(
        &self,
        owner_fp: &str,
        target_fp: &str,
        prior_fp: &str,
        board_fp: &str,
        thread_fp: &str,
    ) -> Result<()> {
        self.send_signal_event(SignalEventPayload::content(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Upvote,
            "",
            board_fp,
            thread_fp,
        ))
        .await
    }

    pub async fn downvote(
        &self,
        owner_fp: &str,
        target_fp: &str,
        prior_fp: &str,
        board_fp: &str,
        thread_fp: &str,
    ) -> Result<()> {
        self.send_signal_event(SignalEventPayload::content(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Downvote,
            "",
            board_fp,
            thread_fp,
        ))
        .await
    }

    pub async fn report_to_mod(
        &self,
        owner_fp: &str,
        target_fp: &str,
        prior_fp: &str,
        reason: &str,
        board_fp: &str,
        thread_fp: &str,
    ) -> Result<()> {
        self.send_signal_event(SignalEventPayload::content(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::ReportToMod,
            reason,
            board_fp,
            thread_fp,
        ))
        .await
    }

    pub async fn mod_block(
        &self,
        owner_fp: &str,
        target_fp: &str,
        prior_fp: &str,
        reason: &str,
        board_fp: &str,
        thread_fp: &str,
    ) -> Result<()> {
        self.send_signal_event(SignalEventPayload::content(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::ModBlock,
            reason,
            board_fp,
            thread_fp,
        ))
        .await
    }

    pub async fn mod_approve(
        &self,
        owner_fp: &str,
        target_fp: &str,
        prior_fp: &str,
        reason: &str,
        board_fp: &str,
        thread_fp: &str,
    ) -> Result<()> {
        self.send_signal_event(SignalEventPayload::content(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::ModApprove,
            reason,
            board_fp,
            thread_fp,
        ))
        .await
    }

    pub async fn follow(&self, owner_fp: &str, target_fp: &str, prior_fp: &str) -> Result<()> {
        self.send_signal_event(SignalEventPayload::user(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Follow,
        ))
        .await
    }

    pub async fn block(&self, owner_fp: &str, target_fp: &str, prior_fp: &str) -> Result<()> {
        self.send_signal_event(SignalEventPayload::user(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Block,
        ))
        .await
    }

    pub async fn elect(&self, owner_fp: &str, target_fp: &str, prior_fp: &str) -> Result<()> {
        self.send_signal_event(SignalEventPayload::user(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Elect,
        ))
        .await
    }

    pub async fn disqualify(&self, owner_fp: &str, target_fp: &str, prior_fp: &str) -> Result<()> {
        self.send_signal_event(SignalEventPayload::user(
            Event::new(owner_fp, prior_fp),
            target_fp,
            SignalKind::Disqualify,
        ))
        .await
    }

    // ========================================================================
    // Content actions
    // ========================================================================

    // An empty prior fingerprint creates; anything else edits.

    pub async fn send_board_content(
        &self,
        owner_fp: &str,
        prior_fp: &str,
        data: BoardContent,
    ) -> Result<()> {
        self.send_content_event(ContentEventPayload::board(
            Event::new(owner_fp, prior_fp),
            data,
        ))
        .await
    }

    pub async fn send_thread_content(
        &self,
        owner_fp: &str,
        prior_fp: &str,
        data: ThreadContent,
    ) -> Result<()> {
        self.send_content_event(ContentEventPayload::thread(
            Event::new(owner_fp, prior_fp),
            data,
        ))
        .await
    }

    pub async fn send_post_content(
        &self,
        owner_fp: &str,
        prior_fp: &str,
        data: PostContent,
    ) -> Result<()> {
        self.send_content_event(ContentEventPayload::post(
            Event::new(owner_fp, prior_fp),
            data,
        ))
        .await
    }

    pub async fn send_user_content(
        &self,
        owner_fp: &str,
        prior_fp: &str,
        data: UserContent,
    ) -> Result<()> {
        self.send_content_event(ContentEventPayload::user(
            Event::new(owner_fp, prior_fp),
            data,
        ))
        .await
    }
}

/// Unwrap a successful response body into a typed value.
fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.ok {
        return Err(AgoraError::FrontendRemote(
            response.error.unwrap_or_default(),
        ));
    }
    let body = response
        .body
        .ok_or_else(|| AgoraError::FrontendProtocol("missing response body".to_string()))?;
    Ok(serde_json::from_value(body)?)
}

/// Check a response that carries no body.
fn expect_ok(response: Response) -> Result<()> {
    if response.ok {
        Ok(())
    } else {
        Err(AgoraError::FrontendRemote(
            response.error.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_error_responses() {
        let result: Result<Vec<CompiledBoard>> = decode(Response::err(1, "board not found"));
        assert!(matches!(result, Err(AgoraError::FrontendRemote(msg)) if msg == "board not found"));
    }

    #[test]
    fn decode_rejects_missing_body() {
        let result: Result<Vec<CompiledBoard>> = decode(Response::ok_empty(1));
        assert!(matches!(result, Err(AgoraError::FrontendProtocol(_))));
    }

    #[test]
    fn decode_parses_typed_body() {
        let boards = vec![CompiledBoard {
            fingerprint: "board-1".to_string(),
            name: "rust".to_string(),
            ..Default::default()
        }];
        let decoded: Vec<CompiledBoard> = decode(Response::ok(1, &boards)).unwrap();
        assert_eq!(decoded, boards);
    }

    #[test]
    fn expect_ok_passes_through_remote_errors() {
        assert!(expect_ok(Response::ok_empty(1)).is_ok());
        assert!(matches!(
            expect_ok(Response::err(2, "rejected")),
            Err(AgoraError::FrontendRemote(msg)) if msg == "rejected"
        ));
    }

    #[test]
    fn request_ids_increment() {
        let client = FrontendClient::new(ReadinessState::new());
        let first = client.request_id.fetch_add(1, Ordering::SeqCst);
        let second = client.request_id.fetch_add(1, Ordering::SeqCst);
        assert!(second > first);
    }
}
