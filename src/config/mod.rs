//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TlsServerSettings (validated)
//!     → loader::engine_config (paths checked on assignment)
//!     → EngineConfig (shared via Arc with the listener)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod engine;
pub mod loader;
pub mod schema;
pub mod validation;

pub use engine::{ConfigError, EngineConfig, VerifyMode};
pub use schema::{StreamSettings, TlsServerSettings, TlsSettings};
