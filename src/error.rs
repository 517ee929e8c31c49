//! Error types for the DefiLlama data layer

use thiserror::Error;

/// Failure talking to an upstream DefiLlama endpoint.
///
/// Every variant carries the endpoint (host-relative path) that failed so the
/// message is useful once it reaches the caller as text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("{endpoint} returned an unreadable body: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::Status { endpoint, .. }
            | FetchError::Timeout { endpoint }
            | FetchError::Network { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status, when the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upstream request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Unexpected upstream response: {0}")]
    UpstreamFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn upstream_format(msg: impl Into<String>) -> Self {
        Error::UpstreamFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
