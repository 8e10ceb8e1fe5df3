//! Turning a tool result into data the renderer understands.
//!
//! Servers may return data as structured content, as one text block holding
//! JSON, or as one text block per row. All three collapse into a
//! [`ToolPayload`]. Anything that carries no data becomes `None`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use sales_assistant_core::protocol::{CallToolResult, ContentBlock};

/// Data returned by a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    /// A non-empty list of rows.
    Rows(Vec<Value>),
    /// A single record.
    Object(Map<String, Value>),
    /// A scalar.
    Other(Value),
}

impl ToolPayload {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(rows) if rows.is_empty() => None,
            Value::Array(rows) => Some(Self::Rows(rows)),
            Value::Object(map) => Some(Self::Object(map)),
            other => Some(Self::Other(other)),
        }
    }
}

/// Extract the data from a tool result.
///
/// `structuredContent.result` is preferred (or the whole structured object
/// if it has no `result` key). Otherwise every text block is parsed as JSON:
/// a single block is taken as-is, several blocks become one row each.
///
/// Returns `None` for error results, unparsable text, empty lists and nulls.
#[must_use]
pub fn normalize_result(result: CallToolResult) -> Option<ToolPayload> {
    if result.is_error {
        debug!("Tool result flagged as error");
        return None;
    }

    if let Some(structured) = result.structured_content {
        let value = match structured {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };
        return ToolPayload::from_value(value);
    }

    let mut values = Vec::with_capacity(result.content.len());
    for block in result.content {
        let ContentBlock::Text { text } = block;
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => values.push(value),
            Err(e) => {
                warn!(error = %e, "Tool result text is not JSON");
                return None;
            }
        }
    }

    if values.len() == 1 {
        values.pop().and_then(ToolPayload::from_value)
    } else {
        ToolPayload::from_value(Value::Array(values))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn text_result(blocks: &[&str]) -> CallToolResult {
        CallToolResult {
            content: blocks
                .iter()
                .map(|text| ContentBlock::Text {
                    text: (*text).to_string(),
                })
                .collect(),
            structured_content: None,
            is_error: false,
        }
    }

    #[test]
    fn test_structured_result_preferred() {
        let mut result = CallToolResult::success(json!([{"product": "Mug"}]));
        result.content = vec![ContentBlock::Text {
            text: "ignored".to_string(),
        }];
        assert_eq!(
            normalize_result(result),
            Some(ToolPayload::Rows(vec![json!({"product": "Mug"})]))
        );
    }

    #[test]
    fn test_structured_without_result_key() {
        let result = CallToolResult {
            content: Vec::new(),
            structured_content: Some(json!({"shop_id": 1, "shop_name": "Downtown"})),
            is_error: false,
        };
        let Some(ToolPayload::Object(map)) = normalize_result(result) else {
            panic!("expected object");
        };
        assert_eq!(map["shop_name"], "Downtown");
    }

    #[test]
    fn test_single_text_block_with_array() {
        let result = text_result(&[r#"[{"product": "Mug"}, {"product": "Tee"}]"#]);
        let Some(ToolPayload::Rows(rows)) = normalize_result(result) else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_one_block_per_row() {
        let result = text_result(&[r#"{"product": "Mug"}"#, r#"{"product": "Tee"}"#]);
        assert_eq!(
            normalize_result(result),
            Some(ToolPayload::Rows(vec![
                json!({"product": "Mug"}),
                json!({"product": "Tee"})
            ]))
        );
    }

    #[test]
    fn test_no_data_cases() {
        assert_eq!(normalize_result(CallToolResult::error("boom")), None);
        assert_eq!(normalize_result(CallToolResult::success(json!([]))), None);
        assert_eq!(normalize_result(CallToolResult::success(Value::Null)), None);
        assert_eq!(normalize_result(text_result(&["not json"])), None);
        assert_eq!(normalize_result(text_result(&[])), None);
    }

    #[test]
    fn test_scalar_is_other() {
        assert_eq!(
            normalize_result(CallToolResult::success(json!(42))),
            Some(ToolPayload::Other(json!(42)))
        );
    }
}
