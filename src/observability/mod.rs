//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! net::listener, net::stream, engine
//!     → tracing events (stream_id, peer_addr, bytes)
//!     → logging.rs subscriber (fmt layer, env filter)
//!     → stdout
//! ```

pub mod logging;
