//! Frontend daemon coordination: the startup handshake and everything
//! gated behind it.
//!
//! Control flow at startup: the client binds its listener and records the
//! port → the supervisor launches the frontend daemon with that port on
//! its command line → the daemon calls back `FrontendReady` with its own
//! API address → the consumer bootstraps its outbound connection → all
//! further data calls flow through the gated consumer.
//!
//! ## Components
//!
//! - [`protocol`]: Request/Response envelopes, typed operations, framing
//! - [`state`]: shared readiness state the handshake advances through
//! - [`supervisor`]: daemon subprocess lifecycle and relaunch schedule
//! - [`listener`]: client API listener the daemon reports into
//! - [`consumer`]: gated client for the daemon's API

pub mod consumer;
pub mod listener;
pub mod protocol;
pub mod state;
pub mod supervisor;

pub use consumer::FrontendClient;
pub use listener::{AmbientSink, ClientApiListener};
pub use protocol::{ClientOp, FrontendOp, Request, Response};
pub use state::{HandshakeSnapshot, ReadinessState};
pub use supervisor::{FrontendSupervisor, RestartPolicy, SupervisorConfig};
