//! Validated tool calls.
//!
//! A [`SalesQuery`] is the only thing that may reach the invocation step.
//! It can only be built from a catalog tool name and parameters that coerce
//! to the declared types, so the rest of the system never sees a raw,
//! unchecked `{tool_name, parameters}` pair.

use std::fmt;

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::catalog::{
    DEFAULT_TOP_PRODUCTS_LIMIT, MAX_TOP_PRODUCTS_LIMIT, ToolName, UnknownTool,
};
use crate::types::{CustomerId, ShopId};

/// Date format accepted for `start_date` / `end_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced while validating a tool call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Tool name is not part of the catalog.
    #[error(transparent)]
    UnknownTool(#[from] UnknownTool),

    /// Parameters were not a JSON object.
    #[error("parameters must be a JSON object")]
    NotAnObject,

    /// A required parameter is absent or null.
    #[error("missing required parameter `{parameter}` for {tool}")]
    MissingParameter {
        /// Tool being called.
        tool: ToolName,
        /// Name of the missing parameter.
        parameter: &'static str,
    },

    /// A parameter could not be coerced to its declared type.
    #[error("invalid value for `{parameter}`: expected {expected}, got {value}")]
    InvalidParameter {
        /// Name of the parameter.
        parameter: &'static str,
        /// Declared type.
        expected: &'static str,
        /// The offending value, as JSON.
        value: String,
    },
}

/// A tool call whose name and parameters have been checked against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SalesQuery {
    /// `GetTopSellingProducts(shop_id, limit)`.
    TopSellingProducts {
        shop_id: ShopId,
        /// Clamped to `1..=MAX_TOP_PRODUCTS_LIMIT`.
        limit: u32,
    },
    /// `GetCustomerOrders(customer_id, start_date?, end_date?)`.
    CustomerOrders {
        customer_id: CustomerId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    },
    /// `GetShopPerformance(shop_id)`.
    ShopPerformance { shop_id: ShopId },
}

impl SalesQuery {
    /// Validate a raw tool call.
    ///
    /// `parameters` may be an object or `null` (treated as no parameters).
    /// Unknown extra keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if the tool is not in the catalog, a required
    /// parameter is missing, or a value cannot be coerced.
    pub fn from_call(tool_name: &str, parameters: &Value) -> Result<Self, QueryError> {
        let tool: ToolName = tool_name.parse()?;
        let empty = Map::new();
        let params = match parameters {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(QueryError::NotAnObject),
        };
        Self::from_tool(tool, params)
    }

    /// Validate parameters for a known tool.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if a required parameter is missing or a value
    /// cannot be coerced.
    pub fn from_tool(tool: ToolName, params: &Map<String, Value>) -> Result<Self, QueryError> {
        match tool {
            ToolName::GetTopSellingProducts => {
                let shop_id = required_id(tool, params, "shop_id")?;
                let limit = optional_int(params, "limit")?
                    .map_or(DEFAULT_TOP_PRODUCTS_LIMIT, clamp_limit);
                Ok(Self::TopSellingProducts {
                    shop_id: ShopId::new(shop_id),
                    limit,
                })
            }
            ToolName::GetCustomerOrders => Ok(Self::CustomerOrders {
                customer_id: CustomerId::new(required_id(tool, params, "customer_id")?),
                start_date: optional_date(params, "start_date")?,
                end_date: optional_date(params, "end_date")?,
            }),
            ToolName::GetShopPerformance => Ok(Self::ShopPerformance {
                shop_id: ShopId::new(required_id(tool, params, "shop_id")?),
            }),
        }
    }

    /// The catalog tool this call targets.
    #[must_use]
    pub const fn tool(&self) -> ToolName {
        match self {
            Self::TopSellingProducts { .. } => ToolName::GetTopSellingProducts,
            Self::CustomerOrders { .. } => ToolName::GetCustomerOrders,
            Self::ShopPerformance { .. } => ToolName::GetShopPerformance,
        }
    }

    /// Wire arguments for invoking the tool.
    #[must_use]
    pub fn arguments(&self) -> Value {
        match self {
            Self::TopSellingProducts { shop_id, limit } => {
                json!({ "shop_id": shop_id, "limit": limit })
            }
            Self::CustomerOrders {
                customer_id,
                start_date,
                end_date,
            } => {
                let mut args = Map::new();
                args.insert("customer_id".to_string(), json!(customer_id));
                if let Some(date) = start_date {
                    args.insert(
                        "start_date".to_string(),
                        json!(date.format(DATE_FORMAT).to_string()),
                    );
                }
                if let Some(date) = end_date {
                    args.insert(
                        "end_date".to_string(),
                        json!(date.format(DATE_FORMAT).to_string()),
                    );
                }
                Value::Object(args)
            }
            Self::ShopPerformance { shop_id } => json!({ "shop_id": shop_id }),
        }
    }
}

impl fmt::Display for SalesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopSellingProducts { shop_id, limit } => {
                write!(f, "{}(shop_id={shop_id}, limit={limit})", self.tool())
            }
            Self::CustomerOrders {
                customer_id,
                start_date,
                end_date,
            } => {
                write!(f, "{}(customer_id={customer_id}", self.tool())?;
                if let Some(date) = start_date {
                    write!(f, ", start_date={date}")?;
                }
                if let Some(date) = end_date {
                    write!(f, ", end_date={date}")?;
                }
                f.write_str(")")
            }
            Self::ShopPerformance { shop_id } => {
                write!(f, "{}(shop_id={shop_id})", self.tool())
            }
        }
    }
}

// =============================================================================
// Coercion helpers
// =============================================================================

fn clamp_limit(value: i64) -> u32 {
    let clamped = value.clamp(1, i64::from(MAX_TOP_PRODUCTS_LIMIT));
    u32::try_from(clamped).unwrap_or(DEFAULT_TOP_PRODUCTS_LIMIT)
}

/// Coerce a JSON value to an integer.
///
/// Accepts integers, integral floats (`3.0`) and numeric strings (`"3"`).
#[allow(clippy::cast_possible_truncation)] // floats are checked to be integral and bounded
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| f.abs() <= 9_007_199_254_740_992.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn invalid(parameter: &'static str, expected: &'static str, value: &Value) -> QueryError {
    QueryError::InvalidParameter {
        parameter,
        expected,
        value: value.to_string(),
    }
}

fn present<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

fn required_id(
    tool: ToolName,
    params: &Map<String, Value>,
    key: &'static str,
) -> Result<i32, QueryError> {
    let value = present(params, key).ok_or(QueryError::MissingParameter {
        tool,
        parameter: key,
    })?;
    coerce_int(value)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| invalid(key, "integer", value))
}

fn optional_int(params: &Map<String, Value>, key: &'static str) -> Result<Option<i64>, QueryError> {
    present(params, key)
        .map(|value| coerce_int(value).ok_or_else(|| invalid(key, "integer", value)))
        .transpose()
}

fn optional_date(
    params: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<NaiveDate>, QueryError> {
    match present(params, key) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value @ Value::String(s)) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| invalid(key, "date (YYYY-MM-DD)", value)),
        Some(value) => Err(invalid(key, "date (YYYY-MM-DD)", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_selling_defaults_limit() {
        let query =
            SalesQuery::from_call("GetTopSellingProducts", &json!({"shop_id": 2})).expect("valid");
        assert_eq!(
            query,
            SalesQuery::TopSellingProducts {
                shop_id: ShopId::new(2),
                limit: 5
            }
        );
    }

    #[test]
    fn test_coerces_numeric_strings_and_floats() {
        let query = SalesQuery::from_call(
            "GetTopSellingProducts",
            &json!({"shop_id": "1", "limit": 3.0}),
        )
        .expect("valid");
        assert_eq!(
            query,
            SalesQuery::TopSellingProducts {
                shop_id: ShopId::new(1),
                limit: 3
            }
        );
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = SalesQuery::from_call(
            "GetTopSellingProducts",
            &json!({"shop_id": 1, "limit": 10_000}),
        )
        .expect("valid");
        assert!(matches!(query, SalesQuery::TopSellingProducts { limit: 100, .. }));

        let query =
            SalesQuery::from_call("GetTopSellingProducts", &json!({"shop_id": 1, "limit": 0}))
                .expect("valid");
        assert!(matches!(query, SalesQuery::TopSellingProducts { limit: 1, .. }));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let err = SalesQuery::from_call("DropTables", &json!({})).expect_err("should fail");
        assert!(matches!(err, QueryError::UnknownTool(_)));
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = SalesQuery::from_call("GetShopPerformance", &json!({})).expect_err("should fail");
        assert_eq!(
            err,
            QueryError::MissingParameter {
                tool: ToolName::GetShopPerformance,
                parameter: "shop_id"
            }
        );

        let err = SalesQuery::from_call("GetCustomerOrders", &json!({"customer_id": null}))
            .expect_err("should fail");
        assert!(matches!(err, QueryError::MissingParameter { .. }));
    }

    #[test]
    fn test_invalid_parameter_types() {
        let err = SalesQuery::from_call("GetShopPerformance", &json!({"shop_id": "three"}))
            .expect_err("should fail");
        assert!(matches!(
            err,
            QueryError::InvalidParameter {
                parameter: "shop_id",
                ..
            }
        ));

        let err = SalesQuery::from_call("GetShopPerformance", &json!({"shop_id": 1.5}))
            .expect_err("should fail");
        assert!(matches!(err, QueryError::InvalidParameter { .. }));

        let err = SalesQuery::from_call("GetShopPerformance", &json!([1]))
            .expect_err("should fail");
        assert_eq!(err, QueryError::NotAnObject);
    }

    #[test]
    fn test_customer_orders_dates() {
        let query = SalesQuery::from_call(
            "GetCustomerOrders",
            &json!({"customer_id": 5, "start_date": "2025-01-01", "end_date": ""}),
        )
        .expect("valid");
        assert_eq!(
            query,
            SalesQuery::CustomerOrders {
                customer_id: CustomerId::new(5),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
                end_date: None,
            }
        );

        let err = SalesQuery::from_call(
            "GetCustomerOrders",
            &json!({"customer_id": 5, "start_date": "01/02/2025"}),
        )
        .expect_err("should fail");
        assert!(matches!(
            err,
            QueryError::InvalidParameter {
                parameter: "start_date",
                ..
            }
        ));
    }

    #[test]
    fn test_arguments_omit_absent_dates() {
        let query = SalesQuery::CustomerOrders {
            customer_id: CustomerId::new(5),
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
        };
        assert_eq!(
            query.arguments(),
            json!({"customer_id": 5, "end_date": "2025-06-30"})
        );
    }

    #[test]
    fn test_arguments_validate_back() {
        let query = SalesQuery::TopSellingProducts {
            shop_id: ShopId::new(4),
            limit: 3,
        };
        let again =
            SalesQuery::from_call(query.tool().as_str(), &query.arguments()).expect("valid");
        assert_eq!(again, query);
    }

    #[test]
    fn test_display() {
        let query = SalesQuery::TopSellingProducts {
            shop_id: ShopId::new(1),
            limit: 3,
        };
        assert_eq!(query.to_string(), "GetTopSellingProducts(shop_id=1, limit=3)");
    }
}
