//! JSON-RPC method dispatch for the tool server.

use serde_json::{Value, json};
use tracing::instrument;

use sales_assistant_core::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, JSONRPC_VERSION,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION,
    ServerCapabilities, ToolsCapability, methods,
};
use sales_assistant_core::tool_catalog;

use crate::db::RepositoryError;
use crate::tools::{ToolError, ToolExecutor};

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "sales-assistant";

/// Answers protocol requests using a [`ToolExecutor`].
#[derive(Clone)]
pub struct McpHandler {
    executor: ToolExecutor,
}

impl McpHandler {
    #[must_use]
    pub const fn new(executor: ToolExecutor) -> Self {
        Self { executor }
    }

    /// Handle one request.
    ///
    /// Returns `None` for notifications, which never get a response.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();

        if request.jsonrpc != JSONRPC_VERSION {
            return id.map(|id| {
                JsonRpcResponse::failure(
                    Some(id),
                    JsonRpcError::invalid_request(format!(
                        "unsupported jsonrpc version: {}",
                        request.jsonrpc
                    )),
                )
            });
        }

        if request.is_notification() {
            if request.method != methods::INITIALIZED {
                tracing::debug!("Ignoring notification");
            }
            return None;
        }

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => Ok(initialize_result()),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => Ok(list_tools_result()),
            methods::TOOLS_CALL => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing params for tools/call"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        let result = match self.executor.call(&params.name, &params.arguments).await {
            Ok(value) => CallToolResult::success(value),
            Err(e) if e.is_invalid_call() => {
                tracing::warn!(tool_name = %params.name, error = %e, "Rejected tool call");
                return Err(JsonRpcError::invalid_params(e.to_string()));
            }
            Err(e) => {
                tracing::error!(tool_name = %params.name, error = %e, "Tool execution failed");
                CallToolResult::error(public_message(&params.name, &e))
            }
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }
}

/// Short message for a failed call; database details stay in the logs.
fn public_message(tool: &str, error: &ToolError) -> String {
    match error {
        ToolError::Repository(RepositoryError::NotFound(what)) => format!("{tool}: {what} not found"),
        _ => format!("{tool} failed: the database could not answer this request"),
    }
}

fn initialize_result() -> Value {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };
    serde_json::to_value(result).unwrap_or_else(|_| json!({}))
}

fn list_tools_result() -> Value {
    serde_json::to_value(ListToolsResult {
        tools: tool_catalog(),
    })
    .unwrap_or_else(|_| json!({ "tools": [] }))
}
