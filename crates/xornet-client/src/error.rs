//! Error types for the client crate.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use xornet_core::FetchError;

/// REST call failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Could not reach the backend, or the HTTP layer failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `body` is the parsed JSON body, `Null` if the
    /// body was empty or not JSON.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: Value },

    /// 2xx response whose body did not match the expected type.
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized.
    #[error("invalid request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The token returned by the backend could not be persisted.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => FetchError::Rejected {
                status,
                body: body.to_string(),
            },
            ApiError::Decode(e) => FetchError::Decode(e.to_string()),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

/// Token file failures.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("{field} must be at least 1 ms")]
    ZeroDuration { field: &'static str },
}
