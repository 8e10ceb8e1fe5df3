//! Parsing of the model's tool-selection reply.
//!
//! The model is asked for a bare JSON object, but replies often wrap it in a
//! fenced code block or a sentence of prose. [`extract_json_object`] digs the
//! object out; [`parse_selection`] checks its shape and validates the call.

use serde_json::{Map, Value};

use sales_assistant_core::SalesQuery;

use super::SelectionError;

const FENCE: &str = "```";

/// Find the first JSON object in `text`.
///
/// Fenced code blocks are searched first (with or without a language tag),
/// then the whole text. Braces inside JSON strings do not count toward
/// nesting.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    fenced_blocks(text)
        .into_iter()
        .find_map(first_object)
        .or_else(|| first_object(text))
}

/// Parse a reply into a validated tool call.
///
/// The object must have exactly two keys: a string `tool_name` and an object
/// `parameters`.
///
/// # Errors
///
/// Returns `SelectionError` if no object is found, the object has another
/// shape, or the call does not validate against the catalog.
pub fn parse_selection(text: &str) -> Result<SalesQuery, SelectionError> {
    let object = extract_json_object(text).ok_or(SelectionError::NoJsonObject)?;

    if let Some(extra) = object
        .keys()
        .find(|k| k.as_str() != "tool_name" && k.as_str() != "parameters")
    {
        return Err(SelectionError::MalformedSelection(format!(
            "unexpected key `{extra}`"
        )));
    }

    let tool_name = match object.get("tool_name") {
        Some(Value::String(name)) => name,
        Some(_) => {
            return Err(SelectionError::MalformedSelection(
                "`tool_name` must be a string".to_string(),
            ));
        }
        None => {
            return Err(SelectionError::MalformedSelection(
                "missing `tool_name`".to_string(),
            ));
        }
    };

    let parameters = match object.get("parameters") {
        Some(value @ Value::Object(_)) => value,
        Some(_) => {
            return Err(SelectionError::MalformedSelection(
                "`parameters` must be an object".to_string(),
            ));
        }
        None => {
            return Err(SelectionError::MalformedSelection(
                "missing `parameters`".to_string(),
            ));
        }
    };

    Ok(SalesQuery::from_call(tool_name, parameters)?)
}

/// Contents of every fenced code block, language tag stripped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        // Language tag runs to the end of the opening line.
        let body_start = after_open.find('\n').map_or(0, |i| i + 1);
        let body = &after_open[body_start..];
        let Some(close) = body.find(FENCE) else {
            blocks.push(body);
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + FENCE.len()..];
    }

    blocks
}

/// The first balanced `{...}` span in `text` that parses as a JSON object.
fn first_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| {
            let end = balanced_end(&text[start..])?;
            serde_json::from_str::<Map<String, Value>>(&text[start..start + end]).ok()
        })
}

/// Byte length of the balanced object starting at the beginning of `text`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use sales_assistant_core::{CustomerId, ShopId};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bare_object() {
        let object = extract_json_object(r#"{"tool_name": "GetShopPerformance", "parameters": {"shop_id": 2}}"#)
            .expect("object");
        assert_eq!(object["tool_name"], "GetShopPerformance");
    }

    #[test]
    fn test_fenced_json_block() {
        let reply = "Here is the call:\n```json\n{\"tool_name\": \"GetCustomerOrders\", \"parameters\": {\"customer_id\": 5}}\n```\nLet me know!";
        let query = parse_selection(reply).expect("valid");
        assert_eq!(
            query,
            SalesQuery::CustomerOrders {
                customer_id: CustomerId::new(5),
                start_date: None,
                end_date: None,
            }
        );
    }

    #[test]
    fn test_bare_fence_and_prose() {
        let reply = "Sure.\n```\n{\"tool_name\": \"GetTopSellingProducts\", \"parameters\": {\"shop_id\": 1, \"limit\": 3}}\n```";
        let query = parse_selection(reply).expect("valid");
        assert_eq!(
            query,
            SalesQuery::TopSellingProducts {
                shop_id: ShopId::new(1),
                limit: 3
            }
        );

        let reply = "I'd use {\"tool_name\": \"GetShopPerformance\", \"parameters\": {\"shop_id\": 4}} for that.";
        assert!(parse_selection(reply).is_ok());
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"note {"tool_name": "GetShopPerformance", "parameters": {"shop_id": 1, "note": "a } b { c"}}"#;
        let object = extract_json_object(text).expect("object");
        assert_eq!(object["parameters"]["note"], "a } b { c");
    }

    #[test]
    fn test_skips_unparsable_candidate() {
        let text = "{not json} then {\"tool_name\": \"GetShopPerformance\", \"parameters\": {\"shop_id\": 1}}";
        let object = extract_json_object(text).expect("object");
        assert_eq!(object["parameters"], json!({"shop_id": 1}));
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json_object("I am not sure which tool to use.").is_none());
        assert!(matches!(
            parse_selection("no json here"),
            Err(SelectionError::NoJsonObject)
        ));
    }

    #[test]
    fn test_shape_is_enforced() {
        let err = parse_selection(r#"{"tool": "GetShopPerformance", "parameters": {}}"#)
            .expect_err("wrong key");
        assert!(matches!(err, SelectionError::MalformedSelection(_)));

        let err = parse_selection(r#"{"tool_name": "GetShopPerformance", "parameters": [1]}"#)
            .expect_err("array parameters");
        assert!(matches!(err, SelectionError::MalformedSelection(_)));

        let err = parse_selection(r#"{"tool_name": 3, "parameters": {}}"#)
            .expect_err("numeric tool name");
        assert!(matches!(err, SelectionError::MalformedSelection(_)));

        let err = parse_selection(
            r#"{"tool_name": "GetShopPerformance", "parameters": {"shop_id": 1}, "reason": "x"}"#,
        )
        .expect_err("extra key");
        assert!(matches!(err, SelectionError::MalformedSelection(_)));
    }

    #[test]
    fn test_non_catalog_tool_rejected() {
        let err = parse_selection(r#"{"tool_name": "DropTables", "parameters": {}}"#)
            .expect_err("unknown tool");
        assert!(matches!(err, SelectionError::InvalidCall(_)));
    }

    #[test]
    fn test_missing_required_parameter_rejected() {
        let err = parse_selection(r#"{"tool_name": "GetCustomerOrders", "parameters": {}}"#)
            .expect_err("missing customer_id");
        assert!(matches!(err, SelectionError::InvalidCall(_)));
    }

    #[test]
    fn test_unterminated_fence() {
        let reply = "```json\n{\"tool_name\": \"GetShopPerformance\", \"parameters\": {\"shop_id\": 3}}";
        assert!(parse_selection(reply).is_ok());
    }
}
