//! Agora - client coordination core for a federated discussion network
//!
//! This crate is the client side of a three-process arrangement: it
//! supervises an external frontend daemon, runs a loopback listener the
//! daemon reports readiness and pushes view data into, and gates all
//! outbound data calls until that handshake completes. UI layers embed
//! the library and consume [`frontend::FrontendClient`] plus an
//! [`frontend::AmbientSink`] implementation.

pub mod error;
pub mod frontend;
pub mod models;
pub mod services;

pub use error::{AgoraError, Result};
