//! Tool commands: `tools` and `call`.

use sales_assistant_client::normalize::normalize_result;
use sales_assistant_client::render::render;
use sales_assistant_client::session::NO_RESULTS;
use sales_assistant_client::{ClientConfig, ToolTransport};
use sales_assistant_core::SalesQuery;
use serde_json::Value;

use super::{CommandError, start_server, stop_server};

/// Print the server's tool catalog.
///
/// # Errors
///
/// Returns an error if the server cannot be started or queried.
#[allow(clippy::print_stdout)]
pub async fn list(config: &ClientConfig) -> Result<(), CommandError> {
    let transport = start_server(config).await?;
    let tools = transport.list_tools().await;
    stop_server(transport).await;

    for tool in tools? {
        println!("{}", tool.name);
        println!("    {}", tool.description);
        println!("    required: {}", tool.required_parameters().join(", "));
    }
    Ok(())
}

/// Validate and invoke a tool call, then print the rendered result.
///
/// # Errors
///
/// Returns an error if the parameters are not a valid call for `tool`, or
/// the server cannot be reached.
#[allow(clippy::print_stdout)]
pub async fn call(
    config: &ClientConfig,
    tool: &str,
    params: &str,
    raw: bool,
) -> Result<(), CommandError> {
    let params: Value =
        serde_json::from_str(params).map_err(|e| CommandError::InvalidParams(e.to_string()))?;
    let query = SalesQuery::from_call(tool, &params)?;
    tracing::info!(query = %query, "Calling tool");

    let transport = start_server(config).await?;
    let result = transport
        .call_tool(query.tool().as_str(), query.arguments())
        .await;
    stop_server(transport).await;
    let result = result?;

    if raw {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CommandError::Output(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    match normalize_result(result) {
        Some(payload) => println!("{}", render(&query, &payload)),
        None => println!("{NO_RESULTS}"),
    }
    Ok(())
}
