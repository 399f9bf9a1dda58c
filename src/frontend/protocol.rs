//! Wire protocol for both loopback connections: the client API (daemon
//! pushes into the client listener) and the frontend API (client calls
//! into the daemon).
//!
//! ## Framing
//!
//! Messages are length-delimited JSON:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON-encoded message
//!
//! Both directions use the same `Request`/`Response` envelopes; only the
//! operation enum differs. The external schema that used to define these
//! operations is out of scope here, so this module owns the encoding; it
//! is the only place a different codec would need to touch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::models::{
    AmbientBoard, AmbientLocalUserPayload, AmbientStatusPayload, BoardSignalRequest,
    CompiledThread, ContentEventPayload, EntityByKeyRequest, NotificationsPayload,
    SignalEventPayload, UserViewRequest,
};

/// Maximum message size (16 MB) to bound per-connection memory use
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Request envelope. `O` is one of the direction-specific operation enums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<O> {
    /// Unique request identifier for correlating responses
    pub id: u64,
    /// The operation to perform
    pub op: O,
}

impl<O> Request<O> {
    pub fn new(id: u64, op: O) -> Self {
        Self { id, op }
    }
}

/// Response envelope, shared by both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: u64,
    /// Whether the operation succeeded
    pub ok: bool,
    /// Response body (operation-specific data)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Error message if ok is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Create a successful response with a body
    pub fn ok(id: u64, body: impl Serialize) -> Self {
        Self {
            id,
            ok: true,
            body: Some(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    /// Create a successful response with no body
    pub fn ok_empty(id: u64) -> Self {
        Self {
            id,
            ok: true,
            body: None,
            error: None,
        }
    }

    /// Create an error response
    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            body: None,
            error: Some(error.into()),
        }
    }
}

/// Operations the frontend daemon invokes on the client listener.
///
/// `FrontendReady` is the handshake step; everything else is an ambient
/// push the daemon sends once connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientOp {
    /// The daemon's API server is up at the given loopback address
    FrontendReady { address: String, port: u16 },
    /// Replace the ambient board list
    DeliverAmbients { boards: Vec<AmbientBoard> },
    /// Partial health-status update
    AmbientStatus(AmbientStatusPayload),
    /// The local user entity changed
    AmbientLocalUser(AmbientLocalUserPayload),
    /// Replace the home view thread list
    HomeView { threads: Vec<CompiledThread> },
    /// Replace the popular view thread list
    PopularView { threads: Vec<CompiledThread> },
    /// Replace the notification list
    Notifications(NotificationsPayload),
    /// Onboarding finished (or was rolled back)
    OnboardComplete { complete: bool },
    /// Mod tooling visibility toggled
    ModModeEnabled { enabled: bool },
}

/// Operations the client invokes on the frontend daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FrontendOp {
    /// Tell the daemon which port the client listener accepts pushes on.
    /// Sent exactly once per connection as part of the bootstrap.
    RegisterClientPort { port: u16 },
    /// List every known board
    GetAllBoards,
    /// One board plus its threads
    GetBoardAndThreads { board_fingerprint: String },
    /// One thread plus its posts
    GetThreadAndPosts {
        board_fingerprint: String,
        thread_fingerprint: String,
    },
    /// A user plus the requested parts of their content graph
    GetUserAndGraph(UserViewRequest),
    /// Page of raw entities for diagnostic views
    GetUncompiledEntityByKey(EntityByKeyRequest),
    /// Write back per-board subscription state
    SetBoardSignal(BoardSignalRequest),
    /// Create or edit a user-owned entity
    SendContentEvent(ContentEventPayload),
    /// Cast a vote / report / mod action / trust signal
    SendSignalEvent(SignalEventPayload),
    /// Ask the daemon to drop completed inflight entries
    PruneInflights,
}

/// Write a length-delimited frame to an async writer.
///
/// # Errors
///
/// Returns an error if the data exceeds MAX_MESSAGE_SIZE or writing fails.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "message too large: {} bytes (max {})",
                data.len(),
                MAX_MESSAGE_SIZE
            ),
        ));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-delimited frame from an async reader.
///
/// # Errors
///
/// Returns an error on EOF, on an oversized length prefix, or if reading
/// fails.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {} bytes (max {})", len, MAX_MESSAGE_SIZE),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Serialize and write one message as a frame.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let json =
        serde_json::to_vec(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_frame(writer, &json).await
}

/// Read one frame and deserialize it.
pub async fn read_message<R, T>(reader: &mut R) -> io::Result<T>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
