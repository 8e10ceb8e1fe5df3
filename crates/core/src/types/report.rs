//! Result records returned by the analytics tools.
//!
//! Field names are part of the tool contract: clients render these records
//! by key, so renaming a field is a breaking change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, ShopId};

/// Placeholder category reported for a shop without any orders.
pub const NO_CATEGORY: &str = "N/A";

/// A product ranked by units sold within one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    /// Product primary key.
    pub product_id: ProductId,
    /// Product display name.
    pub product: String,
    /// Product category.
    pub category: String,
    /// Total units sold across all orders of this product.
    pub quantity_sold: i64,
    /// Shop the ranking was computed for.
    pub shop_id: ShopId,
}

/// One order line in a customer's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrder {
    /// Order primary key.
    pub order_id: OrderId,
    /// Product display name.
    pub product: String,
    /// Product category.
    pub category: String,
    /// Units ordered.
    pub quantity: i32,
    /// Order date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Name of the shop the order was placed at.
    pub shop: String,
}

/// Aggregate metrics for one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopPerformance {
    pub shop_id: ShopId,
    pub shop_name: String,
    pub location: String,
    /// Distinct customers with at least one order.
    pub unique_customers: i64,
    pub total_items_sold: i64,
    /// Sum of `quantity * price` over all orders, `0.0` without orders.
    pub total_revenue: f64,
    /// Category with the most units sold, [`NO_CATEGORY`] without orders.
    pub top_category: String,
    pub top_category_sales: i64,
}

impl ShopPerformance {
    /// Metrics for a shop that has not sold anything yet.
    #[must_use]
    pub fn without_orders(shop_id: ShopId, shop_name: String, location: String) -> Self {
        Self {
            shop_id,
            shop_name,
            location,
            unique_customers: 0,
            total_items_sold: 0,
            total_revenue: 0.0,
            top_category: NO_CATEGORY.to_string(),
            top_category_sales: 0,
        }
    }
}
