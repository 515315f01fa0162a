//! Key material locations and peer verification policy for TLS engines.
//!
//! # Responsibilities
//! - Hold private key, certificate and trust anchor paths
//! - Reject paths that do not exist at assignment time
//! - Readiness check before any engine is built from the config
//!
//! # Design Decisions
//! - Paths are checked when assigned, not when the engine is created, so a
//!   typo fails at startup instead of on the first connection
//! - The config is built once and shared behind an `Arc`; it is never mutated
//!   after the listener starts

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling or checking an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key, certificate or trust anchor path does not exist.
    #[error("No such {kind} file '{}'", .path.display())]
    MissingFile { kind: &'static str, path: PathBuf },

    /// A mandatory field was never assigned.
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// Unknown numeric verification mode.
    #[error("Invalid verify mode: {0}")]
    InvalidVerifyMode(u8),
}

/// Peer certificate verification policy.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    /// Do not request or verify a peer certificate.
    #[default]
    None = 0,
    /// Verify the peer certificate if one is presented.
    Peer = 1,
    /// Verify the peer certificate and fail the handshake if none is sent.
    PeerRequireCert = 2,
}

impl VerifyMode {
    /// Whether a peer certificate is verified at all.
    pub fn verifies_peer(self) -> bool {
        !matches!(self, VerifyMode::None)
    }
}

impl TryFrom<u8> for VerifyMode {
    type Error = ConfigError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(VerifyMode::None),
            1 => Ok(VerifyMode::Peer),
            2 => Ok(VerifyMode::PeerRequireCert),
            other => Err(ConfigError::InvalidVerifyMode(other)),
        }
    }
}

impl From<VerifyMode> for u8 {
    fn from(mode: VerifyMode) -> Self {
        mode as u8
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::None => write!(f, "none"),
            VerifyMode::Peer => write!(f, "peer"),
            VerifyMode::PeerRequireCert => write!(f, "peer_require_cert"),
        }
    }
}

/// Key material and verification mode used to build TLS engines.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    key: Option<PathBuf>,
    cert: Option<PathBuf>,
    ca: Option<PathBuf>,
    verify_mode: VerifyMode,
}

impl EngineConfig {
    /// Create an empty config with verification disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Private key path (PEM).
    pub fn key(&self) -> Option<&Path> {
        self.key.as_deref()
    }

    /// Certificate chain path (PEM).
    pub fn cert(&self) -> Option<&Path> {
        self.cert.as_deref()
    }

    /// Trust anchor path (PEM).
    pub fn ca(&self) -> Option<&Path> {
        self.ca.as_deref()
    }

    pub fn verify_mode(&self) -> VerifyMode {
        self.verify_mode
    }

    pub fn set_key(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.key = Some(existing("key", path.as_ref())?);
        Ok(())
    }

    pub fn set_cert(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.cert = Some(existing("cert", path.as_ref())?);
        Ok(())
    }

    pub fn set_ca(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.ca = Some(existing("ca", path.as_ref())?);
        Ok(())
    }

    pub fn set_verify_mode(&mut self, mode: VerifyMode) {
        self.verify_mode = mode;
    }

    /// Readiness check for server-side use.
    ///
    /// Must pass before a server engine is built from this config.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.key.is_none() {
            return Err(ConfigError::NotConfigured("Key"));
        }
        if self.cert.is_none() {
            return Err(ConfigError::NotConfigured("Cert"));
        }
        if self.verify_mode.verifies_peer() && self.ca.is_none() {
            return Err(ConfigError::NotConfigured("CA"));
        }
        Ok(())
    }

    /// Readiness check for client-side use.
    ///
    /// Key and cert are optional (client authentication) but must come as a pair.
    pub fn check_client(&self) -> Result<(), ConfigError> {
        match (&self.key, &self.cert) {
            (Some(_), None) => return Err(ConfigError::NotConfigured("Cert")),
            (None, Some(_)) => return Err(ConfigError::NotConfigured("Key")),
            _ => {}
        }
        if self.verify_mode.verifies_peer() && self.ca.is_none() {
            return Err(ConfigError::NotConfigured("CA"));
        }
        Ok(())
    }
}

fn existing(kind: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}
