//! Errors from the Messages API.
//!
//! Any of these means the model could not pick a tool for the question; the
//! selector maps them all to a selection failure.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with the API's error type, or `http_<status>`
    /// when the body was not an API error.
    #[error("API error {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    /// 429, with the `Retry-After` seconds.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API key rejected")]
    Unauthorized,

    #[error("could not decode response: {0}")]
    Decode(String),

    /// The reply held no text block.
    #[error("response contained no text")]
    EmptyResponse,

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClaudeError {
    /// Whether asking again later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, kind, .. } => *status >= 500 || kind == "overloaded_error",
            Self::Unauthorized | Self::Decode(_) | Self::EmptyResponse | Self::Config(_) => false,
        }
    }
}

/// Error body: `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}
