//! Text rendering of tool results.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use sales_assistant_core::{NO_CATEGORY, SalesQuery};

use crate::normalize::ToolPayload;

/// Shown when the payload does not have the shape the tool returns.
pub const UNEXPECTED_FORMAT: &str = "Unexpected result format";

const MISSING: &str = "N/A";

/// Render a tool's payload as text.
#[must_use]
pub fn render(query: &SalesQuery, payload: &ToolPayload) -> String {
    match query {
        SalesQuery::TopSellingProducts { .. } => render_rows(payload, |i, row| {
            format!(
                "{i}. {} (Category: {}) - Sold: {}",
                field(row, "product"),
                field(row, "category"),
                field(row, "quantity_sold"),
            )
        }),
        SalesQuery::CustomerOrders { .. } => render_rows(payload, |_, row| {
            format!(
                "[{}] {} (Qty: {}) at {}",
                field(row, "date"),
                field(row, "product"),
                field(row, "quantity"),
                field(row, "shop"),
            )
        }),
        SalesQuery::ShopPerformance { .. } => match payload {
            ToolPayload::Object(record) => render_performance(record),
            ToolPayload::Rows(rows) => match rows.as_slice() {
                [Value::Object(record)] => render_performance(record),
                _ => UNEXPECTED_FORMAT.to_string(),
            },
            ToolPayload::Other(_) => UNEXPECTED_FORMAT.to_string(),
        },
    }
}

/// One line per row, numbered from 1. A lone record is a one-row list.
fn render_rows<F>(payload: &ToolPayload, line: F) -> String
where
    F: Fn(usize, &Map<String, Value>) -> String,
{
    match payload {
        ToolPayload::Rows(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(record) => line(i + 1, record),
                other => format!("{}. {}", i + 1, scalar(other)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ToolPayload::Object(record) => line(1, record),
        ToolPayload::Other(_) => UNEXPECTED_FORMAT.to_string(),
    }
}

fn render_performance(record: &Map<String, Value>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Shop: {} (ID {}) - {}",
        field(record, "shop_name"),
        field(record, "shop_id"),
        field(record, "location"),
    );
    let _ = writeln!(out, "Unique customers: {}", field(record, "unique_customers"));
    let _ = writeln!(out, "Items sold: {}", field(record, "total_items_sold"));
    let revenue = record
        .get("total_revenue")
        .and_then(Value::as_f64)
        .map_or_else(|| MISSING.to_string(), |r| format!("{r:.2}"));
    let _ = writeln!(out, "Revenue: {revenue}");

    let category = field(record, "top_category");
    if category == NO_CATEGORY {
        let _ = write!(out, "Top category: {NO_CATEGORY}");
    } else {
        let _ = write!(
            out,
            "Top category: {category} ({} sold)",
            field(record, "top_category_sales")
        );
    }
    out
}

/// A field as display text, `N/A` when absent or null.
fn field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .map_or_else(|| MISSING.to_string(), scalar)
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
