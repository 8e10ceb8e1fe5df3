//! Tool executor.
//!
//! Maps validated [`SalesQuery`] values onto [`SalesStore`] calls and
//! serializes the records into the JSON result returned over the protocol.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use sales_assistant_core::catalog::tool_definition;
use sales_assistant_core::{QueryError, SalesQuery, ToolName};

use crate::db::{RepositoryError, SalesStore};

/// Errors that can occur while executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The call did not validate against the catalog.
    #[error("invalid tool call: {0}")]
    InvalidCall(#[from] QueryError),

    /// The store failed to answer.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// The result could not be serialized.
    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Whether the caller sent a bad request, as opposed to an execution failure.
    #[must_use]
    pub const fn is_invalid_call(&self) -> bool {
        matches!(self, Self::InvalidCall(_))
    }
}

/// Executor for the sales analytics tools.
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn SalesStore>,
}

impl ToolExecutor {
    /// Create a new tool executor.
    #[must_use]
    pub fn new(store: Arc<dyn SalesStore>) -> Self {
        Self { store }
    }

    /// Validate a raw call, then execute it.
    ///
    /// Invalid calls never reach the store.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidCall` for unknown tools or bad parameters,
    /// and `ToolError::Repository` if the query fails.
    #[instrument(skip(self, arguments), fields(tool_name = %name))]
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        log_undeclared_parameters(name, arguments);
        let query = SalesQuery::from_call(name, arguments)?;
        self.execute(&query).await
    }

    /// Execute a validated query and return the result as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Repository` if the store fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn execute(&self, query: &SalesQuery) -> Result<Value, ToolError> {
        let value = match *query {
            SalesQuery::TopSellingProducts { shop_id, limit } => {
                serde_json::to_value(self.store.top_selling_products(shop_id, limit).await?)?
            }
            SalesQuery::CustomerOrders {
                customer_id,
                start_date,
                end_date,
            } => serde_json::to_value(
                self.store
                    .customer_orders(customer_id, start_date, end_date)
                    .await?,
            )?,
            SalesQuery::ShopPerformance { shop_id } => {
                serde_json::to_value(self.store.shop_performance(shop_id).await?)?
            }
        };
        Ok(value)
    }
}

/// Extra parameters are accepted and ignored; note them for debugging.
fn log_undeclared_parameters(name: &str, arguments: &Value) {
    let (Ok(tool), Value::Object(map)) = (name.parse::<ToolName>(), arguments) else {
        return;
    };
    let definition = tool_definition(tool);
    let declared = definition.input_schema.get("properties");
    for key in map.keys() {
        if declared.and_then(|p| p.get(key)).is_none() {
            tracing::debug!(parameter = %key, "Ignoring undeclared parameter");
        }
    }
}
