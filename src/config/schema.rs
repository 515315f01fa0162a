//! Configuration schema definitions.
//!
//! Settings for the TLS echo server, deserialized from a TOML file.
//! Paths are kept as plain strings here; they are checked for existence when
//! applied to an [`EngineConfig`](crate::config::EngineConfig).

use serde::{Deserialize, Serialize};

use crate::config::engine::VerifyMode;

/// Root configuration for a TLS listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsServerSettings {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Key material and verification policy.
    pub tls: TlsSettings,

    /// Stream tuning.
    pub stream: StreamSettings,
}

impl Default for TlsServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            tls: TlsSettings::default(),
            stream: StreamSettings::default(),
        }
    }
}

/// TLS key material locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Path to private key file (PEM).
    pub key_path: Option<String>,

    /// Path to certificate chain file (PEM).
    pub cert_path: Option<String>,

    /// Path to trust anchors used to verify peers (PEM).
    pub ca_path: Option<String>,

    /// Peer verification mode.
    pub verify_mode: VerifyMode,
}

/// Per-stream behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Upper bound on bytes pulled from the socket per read.
    pub read_size: usize,

    /// How long `close` waits for an unfinished handshake, in milliseconds.
    pub close_timeout_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            read_size: 16 * 1024,
            close_timeout_ms: 1_000,
        }
    }
}
