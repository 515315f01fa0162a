//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::engine::{ConfigError as EngineConfigError, EngineConfig};
use crate::config::schema::{TlsServerSettings, TlsSettings};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Engine(#[from] EngineConfigError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a TOML file.
pub fn load_config(path: &Path) -> Result<TlsServerSettings, LoadError> {
    let content = fs::read_to_string(path)?;
    let settings: TlsServerSettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(LoadError::Validation)?;

    Ok(settings)
}

/// Apply file settings to a fresh [`EngineConfig`].
///
/// Each path goes through the checked setters, so a missing file fails here.
pub fn engine_config(tls: &TlsSettings) -> Result<EngineConfig, EngineConfigError> {
    let mut config = EngineConfig::new();
    if let Some(key) = &tls.key_path {
        config.set_key(key)?;
    }
    if let Some(cert) = &tls.cert_path {
        config.set_cert(cert)?;
    }
    if let Some(ca) = &tls.ca_path {
        config.set_ca(ca)?;
    }
    config.set_verify_mode(tls.verify_mode);
    Ok(config)
}
