//! Worked examples for the selection prompt.
//!
//! Examples pair a question with the tool call it should produce. The
//! built-in set ships with the crate; a YAML file can replace it.
//!
//! ## YAML Format
//!
//! ```yaml
//! GetTopSellingProducts:
//!   examples:
//!     - query: "What are the top 3 products in shop 1?"
//!       parameters:
//!         shop_id: 1
//!         limit: 3
//!
//! GetShopPerformance:
//!   examples:
//!     - query: "How is shop 4 performing?"
//!       parameters:
//!         shop_id: 4
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use sales_assistant_core::{SalesQuery, get_tool_by_name};

use super::ExamplesError;

const DEFAULT_EXAMPLES_YAML: &str = include_str!("../../tool_examples.yaml");

/// A question and the parameters it should be answered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkedExample {
    /// Natural-language question.
    pub query: String,
    /// Tool parameters for this question.
    #[serde(default)]
    pub parameters: Value,
}

/// Configuration for a single tool's examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExampleConfig {
    /// Examples that should map to this tool.
    pub examples: Vec<WorkedExample>,
}

/// Full configuration file structure, keyed by tool name.
pub type ToolExamplesConfig = BTreeMap<String, ToolExampleConfig>;

/// The examples built into the client.
///
/// Falls back to an empty set if the bundled file does not parse, which the
/// unit tests rule out.
#[must_use]
pub fn default_examples() -> ToolExamplesConfig {
    serde_yaml::from_str(DEFAULT_EXAMPLES_YAML).unwrap_or_default()
}

/// Load worked examples from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub async fn load_examples<P: AsRef<Path>>(
    path: P,
) -> Result<ToolExamplesConfig, ExamplesError> {
    let path = path.as_ref();

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ExamplesError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let config: ToolExamplesConfig = serde_yaml::from_str(&content)
        .map_err(|e| ExamplesError::Config(format!("Failed to parse YAML: {e}")))?;

    debug!(tools = config.len(), "Loaded worked examples");
    Ok(config)
}

/// Validate worked examples.
///
/// Checks that every tool exists, has at least one example, and that each
/// example has a question and parameters that validate for the tool.
#[must_use]
pub fn validate_examples(config: &ToolExamplesConfig) -> Vec<String> {
    let mut errors = Vec::new();

    for (tool_name, tool_config) in config {
        if get_tool_by_name(tool_name).is_none() {
            errors.push(format!("Unknown tool: {tool_name}"));
            continue;
        }

        if tool_config.examples.is_empty() {
            errors.push(format!("No examples provided for tool: {tool_name}"));
        }

        for (i, example) in tool_config.examples.iter().enumerate() {
            if example.query.trim().is_empty() {
                errors.push(format!(
                    "Empty query at index {i} for tool: {tool_name}"
                ));
            }
            if let Err(e) = SalesQuery::from_call(tool_name, &example.parameters) {
                errors.push(format!(
                    "Invalid parameters at index {i} for tool {tool_name}: {e}"
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_examples_are_valid() {
        let config = default_examples();
        assert_eq!(config.len(), 3);
        assert!(validate_examples(&config).is_empty());
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
GetCustomerOrders:
  examples:
    - query: "Show me orders for customer 5"
      parameters:
        customer_id: 5
"#;
        let config: ToolExamplesConfig = serde_yaml::from_str(yaml).expect("valid YAML");
        let orders = config.get("GetCustomerOrders").expect("tool present");
        assert_eq!(orders.examples.len(), 1);
        assert_eq!(orders.examples[0].parameters, json!({"customer_id": 5}));
    }

    #[test]
    fn test_validate_reports_problems() {
        let yaml = r#"
GetSalesForecast:
  examples:
    - query: "Predict next month"
      parameters: {}
GetShopPerformance:
  examples: []
GetCustomerOrders:
  examples:
    - query: "  "
      parameters:
        customer_id: 2
    - query: "Orders please"
      parameters: {}
"#;
        let config: ToolExamplesConfig = serde_yaml::from_str(yaml).expect("valid YAML");
        let errors = validate_examples(&config);

        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("Unknown tool: GetSalesForecast")));
        assert!(errors.iter().any(|e| e.contains("No examples provided for tool: GetShopPerformance")));
        assert!(errors.iter().any(|e| e.contains("Empty query at index 0")));
        assert!(errors.iter().any(|e| e.contains("Invalid parameters at index 1")));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_examples("/nonexistent/tool_examples.yaml")
            .await
            .expect_err("missing file");
        assert!(matches!(err, ExamplesError::Io(_)));
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let path = std::env::temp_dir().join(format!(
            "sales-assistant-examples-{}.yaml",
            std::process::id()
        ));
        tokio::fs::write(&path, "GetShopPerformance: [unclosed")
            .await
            .expect("write temp file");

        let err = load_examples(&path).await.expect_err("bad yaml");
        assert!(matches!(err, ExamplesError::Config(_)));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
