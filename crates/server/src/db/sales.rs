//! `PostgreSQL` implementation of [`SalesStore`].
//!
//! Queries are built at runtime with bound parameters; no value from a tool
//! call is ever interpolated into SQL text.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use tracing::instrument;

use sales_assistant_core::{
    CustomerId, CustomerOrder, OrderId, ProductId, ShopId, ShopPerformance, TopProduct,
};

use super::{RepositoryError, SalesStore};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: i32,
    product: String,
    category: String,
    quantity_sold: i64,
}

impl TopProductRow {
    fn into_report(self, shop_id: ShopId) -> TopProduct {
        TopProduct {
            product_id: ProductId::new(self.product_id),
            product: self.product,
            category: self.category,
            quantity_sold: self.quantity_sold,
            shop_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerOrderRow {
    order_id: i32,
    product: String,
    category: String,
    quantity: i32,
    order_date: NaiveDate,
    shop_name: String,
}

impl From<CustomerOrderRow> for CustomerOrder {
    fn from(row: CustomerOrderRow) -> Self {
        Self {
            order_id: OrderId::new(row.order_id),
            product: row.product,
            category: row.category,
            quantity: row.quantity,
            date: row.order_date,
            shop: row.shop_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    name: String,
    location: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ShopTotalsRow {
    unique_customers: i64,
    total_items_sold: i64,
    total_revenue: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    category: String,
    total: i64,
}

/// Build the performance record from the three partial results.
fn assemble_performance(
    shop_id: ShopId,
    shop: ShopRow,
    totals: ShopTotalsRow,
    top_category: Option<CategoryRow>,
) -> Result<ShopPerformance, RepositoryError> {
    let mut perf = ShopPerformance::without_orders(shop_id, shop.name, shop.location);
    if totals.total_items_sold == 0 {
        return Ok(perf);
    }

    perf.unique_customers = totals.unique_customers;
    perf.total_items_sold = totals.total_items_sold;
    perf.total_revenue = totals.total_revenue.to_f64().ok_or_else(|| {
        RepositoryError::DataCorruption(format!(
            "revenue {} for shop {shop_id} is not representable as f64",
            totals.total_revenue
        ))
    })?;
    if let Some(top) = top_category {
        perf.top_category = top.category;
        perf.top_category_sales = top.total;
    }
    Ok(perf)
}

// =============================================================================
// Repository
// =============================================================================

/// Sales queries against a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgSalesStore {
    pool: PgPool,
}

impl PgSalesStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesStore for PgSalesStore {
    #[instrument(skip(self), fields(shop_id = %shop_id, limit = limit))]
    async fn top_selling_products(
        &self,
        shop_id: ShopId,
        limit: u32,
    ) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r"
            SELECT p.id AS product_id,
                   p.name AS product,
                   COALESCE(p.category, '') AS category,
                   SUM(o.quantity)::BIGINT AS quantity_sold
            FROM orders o
            JOIN products p ON o.product_id = p.id
            WHERE o.shop_id = $1
            GROUP BY p.id, p.name, p.category
            ORDER BY quantity_sold DESC, p.id ASC
            LIMIT $2
            ",
        )
        .bind(shop_id.as_i32())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(rows = rows.len(), "Fetched top selling products");
        Ok(rows.into_iter().map(|r| r.into_report(shop_id)).collect())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn customer_orders(
        &self,
        customer_id: CustomerId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerOrderRow>(
            r"
            SELECT o.id AS order_id,
                   p.name AS product,
                   COALESCE(p.category, '') AS category,
                   o.quantity,
                   o.order_date,
                   s.name AS shop_name
            FROM orders o
            JOIN products p ON o.product_id = p.id
            JOIN shops s ON o.shop_id = s.id
            WHERE o.customer_id = $1
              AND ($2::DATE IS NULL OR o.order_date >= $2)
              AND ($3::DATE IS NULL OR o.order_date <= $3)
            ORDER BY o.order_date DESC, o.id DESC
            ",
        )
        .bind(customer_id.as_i32())
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(rows = rows.len(), "Fetched customer orders");
        Ok(rows.into_iter().map(CustomerOrder::from).collect())
    }

    #[instrument(skip(self), fields(shop_id = %shop_id))]
    async fn shop_performance(&self, shop_id: ShopId) -> Result<ShopPerformance, RepositoryError> {
        let shop = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT name, COALESCE(location, '') AS location
            FROM shops
            WHERE id = $1
            ",
        )
        .bind(shop_id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("shop {shop_id}")))?;

        let totals = sqlx::query_as::<_, ShopTotalsRow>(
            r"
            SELECT COUNT(DISTINCT o.customer_id)::BIGINT AS unique_customers,
                   COALESCE(SUM(o.quantity), 0)::BIGINT AS total_items_sold,
                   COALESCE(SUM(o.quantity * p.price), 0)::NUMERIC AS total_revenue
            FROM orders o
            JOIN products p ON o.product_id = p.id
            WHERE o.shop_id = $1
            ",
        )
        .bind(shop_id.as_i32())
        .fetch_one(&self.pool)
        .await?;

        let top_category = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT COALESCE(p.category, '') AS category,
                   SUM(o.quantity)::BIGINT AS total
            FROM orders o
            JOIN products p ON o.product_id = p.id
            WHERE o.shop_id = $1
            GROUP BY p.category
            ORDER BY total DESC, category ASC
            LIMIT 1
            ",
        )
        .bind(shop_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        assemble_performance(shop_id, shop, totals, top_category)
    }
}
