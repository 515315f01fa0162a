//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, config readiness check)
//!     → stream.rs (EncryptedStream: engine + transport)
//!     → caller reads/writes plaintext
//!
//! Stream lifecycle:
//!     Handshaking → Established → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - The handshake is lazy: it runs inside the first read or write
//! - The socket is reached only through the `Transport` trait
//! - Close is best-effort and always releases the socket

pub mod certificate;
pub mod connector;
pub mod listener;
pub mod stream;
pub mod transport;

pub use certificate::PeerCertificate;
pub use connector::{connect, TlsClientStream};
pub use listener::{Listener, ListenerError, TlsStream};
pub use stream::{CloseOutcome, EncryptedStream, ReadOutcome, StreamError, DEFAULT_CLOSE_TIMEOUT};
pub use transport::Transport;
