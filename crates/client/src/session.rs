//! The question/answer loop.
//!
//! [`SalesAssistant::answer`] runs one question through select, invoke,
//! normalize and render. Every failure becomes a short message; nothing a
//! single question does can end the loop in [`SalesAssistant::run`].

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, instrument, warn};

use sales_assistant_core::SalesQuery;

use crate::claude::ClaudeClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::normalize::normalize_result;
use crate::render::render;
use crate::selection::{
    KeywordSelector, ModelSelector, ToolSelector, default_examples, load_examples,
    validate_examples,
};
use crate::transport::ToolTransport;

/// Shown when no tool matches the question.
pub const NO_TOOL_HINT: &str = "I couldn't understand your request. Try these formats:\n\
- 'Show top 5 products in shop 3'\n\
- 'List orders for customer 10'\n\
- 'How is shop 2 performing?'";

/// Shown when the tool failed or returned no data.
pub const NO_RESULTS: &str = "No results found or a connection issue occurred.";

const PROMPT: &str = "> ";

/// The outcome of one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The tool ran and returned data.
    Rendered {
        /// Tool call that produced the data.
        query: SalesQuery,
        /// Rendered result.
        text: String,
    },
    /// No tool could be determined.
    NoTool,
    /// The call failed or returned nothing.
    NoResults {
        /// Tool call that was attempted.
        query: SalesQuery,
    },
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rendered { query, text } => {
                write!(f, "Using tool: {query}\n\n=== Results ===\n{text}")
            }
            Self::NoTool => f.write_str(NO_TOOL_HINT),
            Self::NoResults { query } => write!(f, "Using tool: {query}\n\n{NO_RESULTS}"),
        }
    }
}

/// Build the selector the configuration calls for.
///
/// With a Claude key, tools are chosen by the model using the configured
/// worked examples; without one, by keyword.
///
/// # Errors
///
/// Returns `ClientError` if the examples cannot be loaded or do not validate,
/// or the Claude client cannot be built.
pub async fn build_selector(config: &ClientConfig) -> Result<Arc<dyn ToolSelector>, ClientError> {
    let Some(claude) = config.claude() else {
        info!("CLAUDE_API_KEY not set, selecting tools by keyword");
        return Ok(Arc::new(KeywordSelector::new()));
    };

    let examples = match &config.examples_path {
        Some(path) => load_examples(path).await?,
        None => default_examples(),
    };
    let problems = validate_examples(&examples);
    if !problems.is_empty() {
        return Err(ClientError::InvalidExamples(problems));
    }

    let client = ClaudeClient::new(claude)?;
    info!(model = client.model(), key = %claude.key_hint(), "Selecting tools with Claude");
    Ok(Arc::new(ModelSelector::new(Arc::new(client), &examples)))
}

/// Answers sales questions by selecting and invoking tools.
#[derive(Clone)]
pub struct SalesAssistant {
    selector: Arc<dyn ToolSelector>,
    transport: Arc<dyn ToolTransport>,
}

impl SalesAssistant {
    /// Create an assistant.
    #[must_use]
    pub fn new(selector: Arc<dyn ToolSelector>, transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            selector,
            transport,
        }
    }

    /// Answer one question.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer(&self, question: &str) -> Answer {
        let query = match self.selector.select(question).await {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "No tool selected");
                return Answer::NoTool;
            }
        };
        info!(query = %query, "Selected tool");

        let result = match self
            .transport
            .call_tool(query.tool().as_str(), query.arguments())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, tool = %query.tool(), "Tool invocation failed");
                return Answer::NoResults { query };
            }
        };

        match normalize_result(result) {
            Some(payload) => Answer::Rendered {
                text: render(&query, &payload),
                query,
            },
            None => {
                info!(tool = %query.tool(), "Tool returned no data");
                Answer::NoResults { query }
            }
        }
    }

    /// Read questions line by line until EOF, `exit` or `quit`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            writer.write_all(PROMPT.as_bytes()).await?;
            writer.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                break;
            }

            let answer = self.answer(question).await;
            writer.write_all(format!("{answer}\n\n").as_bytes()).await?;
        }

        writer.flush().await
    }
}

impl fmt::Debug for SalesAssistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SalesAssistant").finish_non_exhaustive()
    }
}
