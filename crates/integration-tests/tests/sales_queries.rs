//! Repository queries against a seeded `PostgreSQL` schema.
//!
//! Each test creates its own schema from `fixtures/`, so tests can run in
//! parallel against one database.

use chrono::NaiveDate;

use sales_assistant_core::{CustomerId, ShopId};
use sales_assistant_integration_tests::{TestDatabase, fixture_store};
use sales_assistant_server::db::{PgSalesStore, RepositoryError, SalesStore};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

async fn seeded() -> TestDatabase {
    TestDatabase::create()
        .await
        .expect("TEST_DATABASE_URL must be set")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_top_selling_products() {
    let db = seeded().await;
    let store = PgSalesStore::new(db.pool.clone());

    let top = store
        .top_selling_products(ShopId::new(1), 3)
        .await
        .expect("query");
    let ranked: Vec<(i32, i64)> = top
        .iter()
        .map(|p| (p.product_id.as_i32(), p.quantity_sold))
        .collect();
    assert_eq!(ranked, [(1, 8), (3, 5), (4, 4)]);
    assert!(top.iter().all(|p| p.shop_id == ShopId::new(1)));
    assert_eq!(top[0].product, "Espresso Beans");
    assert_eq!(top[0].category, "Groceries");

    let empty = store
        .top_selling_products(ShopId::new(2), 5)
        .await
        .expect("query");
    assert!(empty.is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_customer_orders_with_date_bounds() {
    let db = seeded().await;
    let store = PgSalesStore::new(db.pool.clone());
    let customer = CustomerId::new(5);

    let all = store
        .customer_orders(customer, None, None)
        .await
        .expect("query");
    let ids: Vec<i32> = all.iter().map(|o| o.order_id.as_i32()).collect();
    assert_eq!(ids, [7, 5, 10, 3, 1]);

    let february = store
        .customer_orders(customer, Some(date("2024-02-01")), Some(date("2024-02-28")))
        .await
        .expect("query");
    let ids: Vec<i32> = february.iter().map(|o| o.order_id.as_i32()).collect();
    assert_eq!(ids, [10, 3]);

    // Bounds are inclusive.
    let one_day = store
        .customer_orders(customer, Some(date("2024-03-01")), Some(date("2024-03-01")))
        .await
        .expect("query");
    assert_eq!(one_day.len(), 2);

    let since = store
        .customer_orders(customer, Some(date("2024-02-15")), None)
        .await
        .expect("query");
    assert_eq!(since.len(), 3);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_shop_performance() {
    let db = seeded().await;
    let store = PgSalesStore::new(db.pool.clone());

    let perf = store
        .shop_performance(ShopId::new(3))
        .await
        .expect("query");
    assert_eq!(perf.shop_name, "Market Hall");
    assert_eq!(perf.location, "Eugene");
    assert_eq!(perf.unique_customers, 3);
    assert_eq!(perf.total_items_sold, 9);
    assert!((perf.total_revenue - 132.0).abs() < 1e-9);
    assert_eq!(perf.top_category, "Books");
    assert_eq!(perf.top_category_sales, 8);

    let quiet = store
        .shop_performance(ShopId::new(2))
        .await
        .expect("query");
    assert_eq!(quiet.unique_customers, 0);
    assert_eq!(quiet.top_category, "N/A");
    assert!(quiet.total_revenue.abs() < f64::EPSILON);

    let missing = store.shop_performance(ShopId::new(99)).await;
    assert!(matches!(missing, Err(RepositoryError::NotFound(_))));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_in_memory_store_matches_database() {
    let db = seeded().await;
    let store = PgSalesStore::new(db.pool.clone());
    let fixture = fixture_store();

    for shop in 1..=3 {
        let shop = ShopId::new(shop);
        assert_eq!(
            store.top_selling_products(shop, 10).await.expect("pg"),
            fixture.top_selling_products(shop, 10).await.expect("memory"),
        );
        assert_eq!(
            store.shop_performance(shop).await.expect("pg"),
            fixture.shop_performance(shop).await.expect("memory"),
        );
    }
    for customer in 1..=5 {
        let customer = CustomerId::new(customer);
        assert_eq!(
            store.customer_orders(customer, None, None).await.expect("pg"),
            fixture
                .customer_orders(customer, None, None)
                .await
                .expect("memory"),
        );
    }

    db.cleanup().await;
}
