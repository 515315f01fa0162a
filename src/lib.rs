//! Encrypted streams over raw sockets.
//!
//! An [`EncryptedStream`] pairs one transport with one TLS [`Engine`] and
//! sequences handshake, application data and close-notify traffic behind
//! plain read/write/close calls.

pub mod config;
pub mod engine;
pub mod net;
pub mod observability;

pub use config::{EngineConfig, VerifyMode};
pub use engine::{Engine, RustlsEngine};
pub use net::{CloseOutcome, EncryptedStream, Listener, ReadOutcome, Transport};
