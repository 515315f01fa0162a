//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (read size and close timeout > 0)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - File existence is checked later, when paths are applied to an
//!   `EngineConfig`, so there is exactly one place that reports missing files

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::TlsServerSettings;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate settings, collecting every problem found.
pub fn validate_settings(settings: &TlsServerSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "bind_address",
            message: format!("'{}' is not a socket address", settings.bind_address),
        });
    }
    if settings.stream.read_size == 0 {
        errors.push(ValidationError {
            field: "stream.read_size",
            message: "must be greater than zero".to_string(),
        });
    }
    if settings.stream.close_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "stream.close_timeout_ms",
            message: "must be greater than zero".to_string(),
        });
    }
    if settings.tls.key_path.is_none() {
        errors.push(ValidationError {
            field: "tls.key_path",
            message: "is required".to_string(),
        });
    }
    if settings.tls.cert_path.is_none() {
        errors.push(ValidationError {
            field: "tls.cert_path",
            message: "is required".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
