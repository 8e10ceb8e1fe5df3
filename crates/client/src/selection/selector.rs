//! Tool selectors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use sales_assistant_core::{SalesQuery, tool_catalog};

use crate::claude::CompletionProvider;

use super::{
    KeywordSelector, SelectionError, ToolExamplesConfig, parse_selection,
    render_selection_prompt, select_by_keywords,
};

/// Turns a question into a validated tool call.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    /// Select a tool and parameters for `question`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` if no tool can be determined.
    async fn select(&self, question: &str) -> Result<SalesQuery, SelectionError>;
}

/// Asks a language model to pick the tool.
///
/// The system prompt is rendered once, at construction. A reply that is not
/// a single valid `{tool_name, parameters}` object is rejected; there is no
/// retry.
pub struct ModelSelector {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: String,
}

impl ModelSelector {
    /// Create a selector over the full tool catalog.
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, examples: &ToolExamplesConfig) -> Self {
        Self {
            provider,
            system_prompt: render_selection_prompt(&tool_catalog(), examples),
        }
    }

    /// The system prompt sent with every question.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl std::fmt::Debug for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSelector")
            .field("system_prompt_len", &self.system_prompt.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolSelector for ModelSelector {
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    async fn select(&self, question: &str) -> Result<SalesQuery, SelectionError> {
        let reply = self
            .provider
            .complete(&self.system_prompt, question)
            .await
            .inspect_err(|e| warn!(error = %e, transient = e.is_transient(), "Model request failed"))?;
        debug!(reply = %reply, "Model reply");

        parse_selection(&reply).inspect_err(|e| warn!(error = %e, "Rejected model selection"))
    }
}

#[async_trait]
impl ToolSelector for KeywordSelector {
    async fn select(&self, question: &str) -> Result<SalesQuery, SelectionError> {
        select_by_keywords(question)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sales_assistant_core::{CustomerId, ShopId};

    use super::*;
    use crate::claude::ClaudeError;
    use crate::selection::default_examples;

    /// Replies with a fixed string and records what it was asked.
    struct ScriptedModel {
        reply: Result<String, ()>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedModel {
        async fn complete(&self, system: &str, user: &str) -> Result<String, ClaudeError> {
            self.seen
                .lock()
                .expect("lock")
                .push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(|()| ClaudeError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_model_selection() {
        let model = Arc::new(ScriptedModel::replying(
            "```json\n{\"tool_name\": \"GetShopPerformance\", \"parameters\": {\"shop_id\": 2}}\n```",
        ));
        let selector = ModelSelector::new(model.clone(), &default_examples());

        let query = selector.select("How is shop 2 doing?").await.expect("selected");
        assert_eq!(
            query,
            SalesQuery::ShopPerformance {
                shop_id: ShopId::new(2)
            }
        );

        let seen = model.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, selector.system_prompt());
        assert_eq!(seen[0].1, "How is shop 2 doing?");
    }

    #[tokio::test]
    async fn test_model_selection_rejects_unknown_tool() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"tool_name": "DeleteCustomer", "parameters": {"customer_id": 1}}"#,
        ));
        let selector = ModelSelector::new(model.clone(), &default_examples());

        let err = selector.select("Delete customer 1").await.expect_err("rejected");
        assert!(matches!(err, SelectionError::InvalidCall(_)));
        assert_eq!(model.seen.lock().expect("lock").len(), 1, "no retry");
    }

    #[tokio::test]
    async fn test_model_failure_is_selection_error() {
        let selector = ModelSelector::new(Arc::new(ScriptedModel::failing()), &default_examples());
        let err = selector.select("anything").await.expect_err("failed");
        assert!(matches!(err, SelectionError::Completion(_)));
        assert!(err.to_string().starts_with("could not determine a tool"));
    }

    #[tokio::test]
    async fn test_keyword_selector_as_trait_object() {
        let selector: Box<dyn ToolSelector> = Box::new(KeywordSelector::new());
        let query = selector
            .select("Show me orders for customer 5")
            .await
            .expect("selected");
        assert_eq!(
            query,
            SalesQuery::CustomerOrders {
                customer_id: CustomerId::new(5),
                start_date: None,
                end_date: None,
            }
        );
    }
}
