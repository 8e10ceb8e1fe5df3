//! Top-level client error.

use thiserror::Error;

use crate::claude::ClaudeError;
use crate::config::ConfigError;
use crate::selection::ExamplesError;
use crate::transport::TransportError;

/// Errors that stop the client from starting or from running a command.
///
/// Failures while answering a question are not errors; they become an
/// [`Answer`](crate::session::Answer).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Claude(#[from] ClaudeError),

    #[error(transparent)]
    Examples(#[from] ExamplesError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid worked examples:\n{}", .0.join("\n"))]
    InvalidExamples(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
