//! Subcommand implementations.

pub mod ask;
pub mod examples;
pub mod tools;

use std::sync::Arc;

use sales_assistant_client::{ClientConfig, ClientError, StdioTransport, TransportError};
use sales_assistant_client::selection::ExamplesError;
use sales_assistant_core::QueryError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Examples(#[from] ExamplesError),

    /// `--params` is not JSON.
    #[error("Invalid --params: {0}")]
    InvalidParams(String),

    /// The tool call does not validate.
    #[error("Invalid tool call: {0}")]
    InvalidCall(#[from] QueryError),

    /// A worked-examples file has problems.
    #[error("{0} problem(s) found in worked examples")]
    InvalidExamples(usize),

    /// Output could not be produced.
    #[error("Output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the tool server configured in `config`.
async fn start_server(config: &ClientConfig) -> Result<Arc<StdioTransport>, CommandError> {
    tracing::info!(program = %config.server.program, "Starting tool server...");
    Ok(Arc::new(StdioTransport::spawn(&config.server).await?))
}

/// Shut the tool server down once nothing else holds the transport.
async fn stop_server(transport: Arc<StdioTransport>) {
    match Arc::try_unwrap(transport) {
        Ok(transport) => transport.close().await,
        Err(_) => tracing::debug!("Transport still shared; server stops on drop"),
    }
}
