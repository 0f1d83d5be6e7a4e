//! # Lifecycle Core Configuration Errors
//!
//! Defines [`ConfigError`], raised while reading, parsing or interpreting a
//! lifecycle configuration file.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown or unsupported config format for path: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to parse {format} configuration: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Failed to serialize configuration to {format}: {message}")]
    Serialize { format: &'static str, message: String },

    #[error("Conflicting configuration: {reason}")]
    Conflict { reason: String },
}
