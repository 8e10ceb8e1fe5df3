//! The tool catalog advertised by the sales server.
//!
//! The catalog is static: three read-only analytics tools. Both sides of the
//! protocol use it, the server to answer `tools/list` and the client to build
//! the selection prompt and to whitelist model output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Default number of products returned by `GetTopSellingProducts`.
pub const DEFAULT_TOP_PRODUCTS_LIMIT: u32 = 5;

/// Upper bound applied to the `limit` parameter.
pub const MAX_TOP_PRODUCTS_LIMIT: u32 = 100;

/// Names of the tools in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    GetTopSellingProducts,
    GetCustomerOrders,
    GetShopPerformance,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [Self; 3] = [
        Self::GetTopSellingProducts,
        Self::GetCustomerOrders,
        Self::GetShopPerformance,
    ];

    /// Wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetTopSellingProducts => "GetTopSellingProducts",
            Self::GetCustomerOrders => "GetCustomerOrders",
            Self::GetShopPerformance => "GetShopPerformance",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a catalog tool name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// A tool definition as advertised over the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Names of the required parameters declared by the schema.
    #[must_use]
    pub fn required_parameters(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(serde_json::Value::as_array)
            .map(|names| names.iter().filter_map(serde_json::Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Get the full tool catalog.
#[must_use]
pub fn tool_catalog() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(tool_definition).collect()
}

/// Get a tool definition by its wire name.
#[must_use]
pub fn get_tool_by_name(name: &str) -> Option<ToolDefinition> {
    name.parse::<ToolName>().ok().map(tool_definition)
}

/// Get the definition of a catalog tool.
#[must_use]
pub fn tool_definition(name: ToolName) -> ToolDefinition {
    match name {
        ToolName::GetTopSellingProducts => top_selling_products_tool(),
        ToolName::GetCustomerOrders => customer_orders_tool(),
        ToolName::GetShopPerformance => shop_performance_tool(),
    }
}

fn top_selling_products_tool() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::GetTopSellingProducts.to_string(),
        description: "Returns the top N selling products for a given shop, ranked by total \
            units sold. Each row has product_id, product, category, quantity_sold and shop_id. \
            USE THIS for questions about best sellers, top products or popular items in a shop."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "shop_id": {
                    "type": "integer",
                    "description": "The ID of the shop to query"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of top products to return (default 5)",
                    "default": DEFAULT_TOP_PRODUCTS_LIMIT,
                    "minimum": 1,
                    "maximum": MAX_TOP_PRODUCTS_LIMIT
                }
            },
            "required": ["shop_id"]
        }),
    }
}

fn customer_orders_tool() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::GetCustomerOrders.to_string(),
        description: "Returns the order history of a specific customer, newest first, with an \
            optional inclusive date range. Each row has order_id, product, category, quantity, \
            date and shop. \
            USE THIS for questions about what a customer ordered, bought or purchased."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "customer_id": {
                    "type": "integer",
                    "description": "ID of the customer whose orders to retrieve"
                },
                "start_date": {
                    "type": "string",
                    "format": "date",
                    "description": "Optional start date in YYYY-MM-DD format"
                },
                "end_date": {
                    "type": "string",
                    "format": "date",
                    "description": "Optional end date in YYYY-MM-DD format"
                }
            },
            "required": ["customer_id"]
        }),
    }
}

fn shop_performance_tool() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::GetShopPerformance.to_string(),
        description: "Returns performance metrics for a specific shop: name, location, unique \
            customers, total items sold, total revenue and the top category by units sold. \
            USE THIS for questions about how a shop is doing, its revenue or its sales totals."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "shop_id": {
                    "type": "integer",
                    "description": "ID of the shop to analyze"
                }
            },
            "required": ["shop_id"]
        }),
    }
}
