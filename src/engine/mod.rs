//! TLS engine capability.
//!
//! # Data Flow
//! ```text
//! ciphertext from socket → inject() → read_plaintext() → caller
//! caller → write_plaintext() → extract() → ciphertext to socket
//! handshake / close-notify records → extract() → ciphertext to socket
//! ```
//!
//! # Design Decisions
//! - The engine never touches the socket; `EncryptedStream` shuttles bytes
//! - Any engine with this shape can stand in (rustls in production, scripted
//!   engines in tests)

pub mod rustls_engine;
pub mod tls_config;

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

pub use rustls_engine::RustlsEngine;

/// Errors produced by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed handshake, bad record, failed verification.
    #[error("TLS protocol error: {0}")]
    Protocol(#[from] rustls::Error),

    /// The engine refused to take more ciphertext.
    #[error("Engine stalled: {0}")]
    Stalled(String),

    /// Reading plaintext out of, or writing plaintext into, the engine failed.
    #[error("Engine I/O error: {0}")]
    Io(io::Error),

    /// Key material could not be loaded or assembled.
    #[error("TLS setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A stateful TLS record/handshake engine bound to one connection.
pub trait Engine {
    /// Pull decrypted application bytes, if any are buffered.
    fn read_plaintext(&mut self) -> Result<Option<Vec<u8>>, EngineError>;

    /// Feed raw ciphertext received from the peer.
    ///
    /// Bytes the engine cannot process yet are kept and fed by later
    /// `read_plaintext` calls; nothing is dropped.
    fn inject(&mut self, ciphertext: &[u8]) -> Result<(), EngineError>;

    /// Pull the next chunk of outbound protocol bytes. `None` means drained.
    fn extract(&mut self) -> Option<Vec<u8>>;

    /// Encrypt application bytes, returning how many were consumed.
    fn write_plaintext(&mut self, data: &[u8]) -> Result<usize, EngineError>;

    /// Whether the handshake is still in progress.
    fn is_handshaking(&self) -> bool;

    /// Start or continue the close-notify exchange.
    ///
    /// Returns `true` once both sides have sent close-notify.
    fn shutdown(&mut self) -> Result<bool, EngineError>;

    /// Whether the peer's close-notify has been processed.
    fn peer_closed(&self) -> bool;

    /// DER bytes of the peer's end-entity certificate, once available.
    fn peer_certificate_der(&self) -> Option<Vec<u8>>;
}
