//! Error types for costsentry

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using costsentry's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for costsentry operations
#[derive(Error, Debug)]
pub enum Error {
    /// Monitor configuration file does not exist
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Monitor configuration is present but malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential resolution failed (file, profile, key, or ambient identity)
    #[error("authentication error: {0}")]
    Auth(String),

    /// The usage API rejected or failed the request
    #[error("usage API error{}: {message}", status_suffix(.status))]
    Service {
        /// HTTP status, when the request got far enough to receive one
        status: Option<u16>,
        /// Service-provided detail
        message: String,
    },

    /// Network-level failure talking to an external service
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Alert delivery failed (webhook rejected or unreachable)
    #[error("alert delivery failed: {0}")]
    Delivery(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an auth error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a service error
    pub fn service(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: msg.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}
