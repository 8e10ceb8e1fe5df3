//! Error types for tool selection.

use thiserror::Error;

use sales_assistant_core::QueryError;

use crate::claude::ClaudeError;

/// Errors that can occur during tool selection.
///
/// Every variant means the same thing to the user: no tool could be
/// determined for the question. The variants keep the cause for logs.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The model reply contained no JSON object.
    #[error("could not determine a tool: no JSON object in model reply")]
    NoJsonObject,

    /// The JSON object did not have the `{tool_name, parameters}` shape.
    #[error("could not determine a tool: {0}")]
    MalformedSelection(String),

    /// The selected tool or its parameters failed validation.
    #[error("could not determine a tool: {0}")]
    InvalidCall(#[from] QueryError),

    /// No keyword rule matched the question.
    #[error("could not determine a tool: no matching keywords")]
    NoMatch,

    /// The model could not be asked.
    #[error("could not determine a tool: {0}")]
    Completion(#[from] ClaudeError),
}

/// Errors loading worked examples.
#[derive(Debug, Error)]
pub enum ExamplesError {
    /// IO error (file read).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error (YAML parsing, validation).
    #[error("configuration error: {0}")]
    Config(String),
}
