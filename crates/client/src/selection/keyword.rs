//! Keyword-based tool selection.
//!
//! Used when no model is configured. Rules are checked in order; the first
//! tool whose trigger words appear in the question wins. IDs are read from
//! the number following `shop`/`store`, `top` or `customer`, defaulting to 1.

use serde_json::{Map, json};

use sales_assistant_core::{SalesQuery, ToolName};

use super::SelectionError;

const TOP_PRODUCTS_WORDS: &[&str] = &["top", "best", "selling", "products", "items", "popular"];
const CUSTOMER_ORDER_WORDS: &[&str] = &[
    "orders",
    "order",
    "purchase",
    "purchases",
    "purchased",
    "bought",
    "customer",
];
const PERFORMANCE_WORDS: &[&str] = &[
    "performance",
    "performing",
    "revenue",
    "metrics",
    "doing",
    "summary",
    "stats",
];

const DEFAULT_ID: i64 = 1;

/// Selects a tool from trigger words in the question.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSelector;

impl KeywordSelector {
    /// Create a keyword selector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Select a tool for `question`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::NoMatch` if no trigger word appears.
    pub fn select(&self, question: &str) -> Result<SalesQuery, SelectionError> {
        select_by_keywords(question)
    }
}

/// Select a tool for `question` from its trigger words.
///
/// # Errors
///
/// Returns `SelectionError::NoMatch` if no trigger word appears, or
/// `SelectionError::InvalidCall` if an extracted ID is out of range.
pub fn select_by_keywords(question: &str) -> Result<SalesQuery, SelectionError> {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mentions = |vocabulary: &[&str]| words.iter().any(|w| vocabulary.contains(w));

    let (tool, params) = if mentions(TOP_PRODUCTS_WORDS) {
        let mut params = Map::new();
        params.insert("shop_id".to_string(), json!(shop_number(&words)));
        if let Some(limit) = number_after(&words, &["top"]) {
            params.insert("limit".to_string(), json!(limit));
        }
        (ToolName::GetTopSellingProducts, params)
    } else if mentions(CUSTOMER_ORDER_WORDS) {
        let customer = number_after(&words, &["customer"]).unwrap_or(DEFAULT_ID);
        let mut params = Map::new();
        params.insert("customer_id".to_string(), json!(customer));
        (ToolName::GetCustomerOrders, params)
    } else if mentions(PERFORMANCE_WORDS) {
        let mut params = Map::new();
        params.insert("shop_id".to_string(), json!(shop_number(&words)));
        (ToolName::GetShopPerformance, params)
    } else {
        return Err(SelectionError::NoMatch);
    };

    // Same validation as a model reply, so limits are defaulted and clamped.
    Ok(SalesQuery::from_tool(tool, &params)?)
}

fn shop_number(words: &[&str]) -> i64 {
    number_after(words, &["shop", "store"]).unwrap_or(DEFAULT_ID)
}

/// The integer immediately following the first occurrence of any `markers`.
fn number_after(words: &[&str], markers: &[&str]) -> Option<i64> {
    words
        .windows(2)
        .find_map(|pair| match pair {
            [marker, value] if markers.contains(marker) => Some(value.parse::<i64>().ok()),
            _ => None,
        })
        .flatten()
}
