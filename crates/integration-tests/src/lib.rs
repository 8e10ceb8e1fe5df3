//! Integration tests for the sales assistant.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no database needed)
//! cargo test -p sales-assistant-integration-tests
//!
//! # Database tests against a throwaway schema
//! TEST_DATABASE_URL=postgres://localhost/sales_test \
//!     cargo test -p sales-assistant-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `tool_selection` - catalog, selection and worked-example properties
//! - `protocol` - client and server talking over an in-memory pipe
//! - `sales_queries` - repository queries against `PostgreSQL`
//!
//! This library holds the shared fixtures: an in-memory [`SalesStore`] with
//! the same data as `fixtures/seed.sql`, a scripted completion provider and
//! helpers that wire a client to an in-process server.

#![allow(clippy::missing_panics_doc)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::io::BufReader;

use sales_assistant_client::StdioTransport;
use sales_assistant_client::claude::{ClaudeError, CompletionProvider};
use sales_assistant_core::{
    CustomerId, CustomerOrder, OrderId, ProductId, ShopId, ShopPerformance, TopProduct,
};
use sales_assistant_server::db::{RepositoryError, SalesStore};
use sales_assistant_server::{McpHandler, ToolExecutor, transport};

/// DDL for the sales schema.
pub const SCHEMA_SQL: &str = include_str!("../fixtures/schema.sql");

/// Rows matching [`fixture_store`].
pub const SEED_SQL: &str = include_str!("../fixtures/seed.sql");

// =============================================================================
// In-memory store
// =============================================================================

struct Shop {
    id: i32,
    name: &'static str,
    location: &'static str,
}

struct Product {
    id: i32,
    name: &'static str,
    category: &'static str,
    price: f64,
}

struct Order {
    id: i32,
    shop_id: i32,
    customer_id: i32,
    product_id: i32,
    quantity: i32,
    date: NaiveDate,
}

/// A [`SalesStore`] over fixed rows, answering the way the SQL does.
pub struct InMemoryStore {
    shops: Vec<Shop>,
    products: Vec<Product>,
    orders: Vec<Order>,
    offline: bool,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

/// The dataset in `fixtures/seed.sql`.
#[must_use]
pub fn fixture_store() -> InMemoryStore {
    let shop = |id, name, location| Shop { id, name, location };
    let product = |id, name, category, price| Product {
        id,
        name,
        category,
        price,
    };
    let order = |id, shop_id, customer_id, product_id, quantity, date| Order {
        id,
        shop_id,
        customer_id,
        product_id,
        quantity,
        date,
    };

    InMemoryStore {
        shops: vec![
            shop(1, "Harbor Street Goods", "Portland"),
            shop(2, "Quiet Corner", "Salem"),
            shop(3, "Market Hall", "Eugene"),
        ],
        products: vec![
            product(1, "Espresso Beans", "Groceries", 12.50),
            product(2, "Desk Lamp", "Furniture", 45.00),
            product(3, "Paperback Atlas", "Books", 18.00),
            product(4, "USB Hub", "Electronics", 25.00),
            product(5, "Rain Jacket", "Clothing", 60.00),
            product(6, "Field Notes", "Books", 9.00),
        ],
        orders: vec![
            order(1, 1, 5, 1, 3, date(2024, 1, 5)),
            order(2, 1, 1, 1, 4, date(2024, 1, 7)),
            order(3, 1, 5, 2, 1, date(2024, 2, 10)),
            order(4, 1, 3, 3, 5, date(2024, 2, 11)),
            order(5, 1, 5, 4, 2, date(2024, 3, 1)),
            order(6, 1, 1, 4, 2, date(2024, 3, 1)),
            order(7, 1, 5, 1, 1, date(2024, 3, 1)),
            order(8, 3, 2, 5, 1, date(2024, 1, 20)),
            order(9, 3, 4, 6, 6, date(2024, 2, 2)),
            order(10, 3, 5, 6, 2, date(2024, 2, 15)),
        ],
        offline: false,
    }
}

/// A store whose database is unreachable: every query fails.
#[must_use]
pub fn offline_store() -> InMemoryStore {
    InMemoryStore {
        offline: true,
        ..fixture_store()
    }
}

impl InMemoryStore {
    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.offline {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn product(&self, id: i32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn shop(&self, id: i32) -> Option<&Shop> {
        self.shops.iter().find(|s| s.id == id)
    }
}

#[async_trait]
impl SalesStore for InMemoryStore {
    async fn top_selling_products(
        &self,
        shop_id: ShopId,
        limit: u32,
    ) -> Result<Vec<TopProduct>, RepositoryError> {
        self.check_online()?;

        let mut totals: BTreeMap<i32, i64> = BTreeMap::new();
        for order in self.orders.iter().filter(|o| o.shop_id == shop_id.as_i32()) {
            *totals.entry(order.product_id).or_default() += i64::from(order.quantity);
        }

        let mut ranked: Vec<(i32, i64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(ranked
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .filter_map(|(product_id, quantity_sold)| {
                let product = self.product(product_id)?;
                Some(TopProduct {
                    product_id: ProductId::new(product_id),
                    product: product.name.to_string(),
                    category: product.category.to_string(),
                    quantity_sold,
                    shop_id,
                })
            })
            .collect())
    }

    async fn customer_orders(
        &self,
        customer_id: CustomerId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, RepositoryError> {
        self.check_online()?;

        let mut orders: Vec<&Order> = self
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id.as_i32())
            .filter(|o| start_date.is_none_or(|start| o.date >= start))
            .filter(|o| end_date.is_none_or(|end| o.date <= end))
            .collect();
        orders.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        Ok(orders
            .into_iter()
            .filter_map(|o| {
                let product = self.product(o.product_id)?;
                let shop = self.shop(o.shop_id)?;
                Some(CustomerOrder {
                    order_id: OrderId::new(o.id),
                    product: product.name.to_string(),
                    category: product.category.to_string(),
                    quantity: o.quantity,
                    date: o.date,
                    shop: shop.name.to_string(),
                })
            })
            .collect())
    }

    async fn shop_performance(&self, shop_id: ShopId) -> Result<ShopPerformance, RepositoryError> {
        self.check_online()?;

        let shop = self
            .shop(shop_id.as_i32())
            .ok_or_else(|| RepositoryError::NotFound(format!("shop {shop_id}")))?;
        let mut perf = ShopPerformance::without_orders(
            shop_id,
            shop.name.to_string(),
            shop.location.to_string(),
        );

        let orders: Vec<&Order> = self
            .orders
            .iter()
            .filter(|o| o.shop_id == shop_id.as_i32())
            .collect();
        if orders.is_empty() {
            return Ok(perf);
        }

        let customers: BTreeSet<i32> = orders.iter().map(|o| o.customer_id).collect();
        let mut categories: BTreeMap<&str, i64> = BTreeMap::new();
        for order in &orders {
            let product = self
                .product(order.product_id)
                .ok_or_else(|| RepositoryError::DataCorruption("dangling product".into()))?;
            perf.total_items_sold += i64::from(order.quantity);
            perf.total_revenue += f64::from(order.quantity) * product.price;
            *categories.entry(product.category).or_default() += i64::from(order.quantity);
        }
        perf.unique_customers = i64::try_from(customers.len()).unwrap_or(i64::MAX);

        // Highest total wins; ties go to the alphabetically first category.
        if let Some((category, total)) = categories
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        {
            perf.top_category = category.to_string();
            perf.top_category_sales = total;
        }
        Ok(perf)
    }
}

// =============================================================================
// Scripted model
// =============================================================================

/// A [`CompletionProvider`] that replies from a fixed script, in order.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedModel {
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// User turns received so far.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, ClaudeError> {
        self.questions.lock().expect("lock").push(user.to_string());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or(ClaudeError::EmptyResponse)
    }
}

// =============================================================================
// In-process server
// =============================================================================

/// Start a server over `store` on an in-memory pipe and connect a client.
pub async fn connect_in_process(store: Arc<dyn SalesStore>) -> StdioTransport {
    let (client, server) = tokio::io::duplex(64 * 1024);

    let handler = McpHandler::new(ToolExecutor::new(store));
    let (server_read, server_write) = tokio::io::split(server);
    tokio::spawn(async move {
        let _ = transport::serve(BufReader::new(server_read), server_write, &handler).await;
    });

    let (client_read, client_write) = tokio::io::split(client);
    StdioTransport::connect(BufReader::new(client_read), client_write)
        .await
        .expect("handshake with in-process server")
}

// =============================================================================
// Test database
// =============================================================================

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A seeded copy of the sales schema in its own `PostgreSQL` schema.
pub struct TestDatabase {
    /// Pool whose connections resolve table names in the test schema.
    pub pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDatabase {
    /// Create and seed a fresh schema, or `None` if `TEST_DATABASE_URL` is unset.
    pub async fn create() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let schema = format!(
            "sales_test_{}_{}",
            std::process::id(),
            SCHEMA_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        let admin = PgPool::connect(&url).await.expect("connect to test database");
        sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("create test schema");

        let search_path = schema.clone();
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .after_connect(move |conn, _meta| {
                let statement = format!("SET search_path TO {search_path}");
                Box::pin(async move {
                    sqlx::Executor::execute(&mut *conn, statement.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("connect with test search_path");

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .expect("create tables");
        sqlx::raw_sql(SEED_SQL)
            .execute(&pool)
            .await
            .expect("seed tables");

        Some(Self {
            pool,
            admin,
            schema,
        })
    }

    /// Remove the schema and close both pools.
    pub async fn cleanup(self) {
        self.pool.close().await;
        let _ = sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin)
            .await;
        self.admin.close().await;
    }
}
