//! Database access for the sales analytics schema.
//!
//! # Tables (read-only to this server)
//!
//! - `shops(id, name, location)`
//! - `customers(id, shop_id, name, email, region)`
//! - `products(id, shop_id, name, category, price)`
//! - `orders(id, shop_id, customer_id, product_id, quantity, order_date)`
//!
//! The schema is owned by whoever seeds the database; this crate never
//! creates or migrates it. The integration tests carry a copy of the DDL.

pub mod sales;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sales_assistant_core::{CustomerId, CustomerOrder, ShopId, ShopPerformance, TopProduct};

pub use sales::PgSalesStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Read operations behind the three analytics tools.
#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Products of a shop ranked by units sold, highest first.
    async fn top_selling_products(
        &self,
        shop_id: ShopId,
        limit: u32,
    ) -> Result<Vec<TopProduct>, RepositoryError>;

    /// A customer's orders, newest first, within optional inclusive bounds.
    async fn customer_orders(
        &self,
        customer_id: CustomerId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, RepositoryError>;

    /// Aggregate metrics for one shop.
    ///
    /// Returns `RepositoryError::NotFound` if the shop does not exist.
    async fn shop_performance(&self, shop_id: ShopId) -> Result<ShopPerformance, RepositoryError>;
}

/// Create a lazily-connecting `PostgreSQL` connection pool.
///
/// No connection is opened until the first query, so the server starts and
/// answers `tools/list` even while the database is unreachable.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_pool(
    database_url: &SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(database_url.expose_secret())
}
