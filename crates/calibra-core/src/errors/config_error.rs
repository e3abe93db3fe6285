//! Configuration loading errors.

use super::error_code::{self, CalibraErrorCode};

/// Errors that can occur while loading a TOML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

impl CalibraErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::CONFIG_IO_ERROR,
            Self::Parse { .. } => error_code::CONFIG_PARSE_ERROR,
        }
    }
}
