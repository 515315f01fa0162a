//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binaries
//! - Honour `RUST_LOG`, falling back to a per-binary default filter
//!
//! # Design Decisions
//! - Library code only emits `tracing` events; installing a subscriber is the
//!   binary's job
//! - Stream events carry `stream_id` so one connection can be followed

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `default_filter` applies when `RUST_LOG`
/// is unset or invalid.
pub fn init(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
