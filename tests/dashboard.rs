//! Dashboard aggregation over the in-memory store.

mod common;

use chrono::{Datelike, Utc};
use common::{order_request, seed_category, seed_product};
use ebazaar::dashboard::format_graph_stats;
use ebazaar::domain::{OrderStatus, PaymentStatus};
use ebazaar::store::{DashboardStore, MemoryStore, OrderStore};

#[tokio::test]
async fn sales_stats_count_orders_and_payment_buckets() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 50).await;

    let first = store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .unwrap();
    store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .unwrap();
    let third = store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .unwrap();

    store
        .update_order_status(first.id, None, Some(PaymentStatus::Paid))
        .await
        .unwrap();
    store.cancel_order(third.id, None).await.unwrap();

    let stats = store.sales_stats().await.unwrap();
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.total_sales, 3 * 599);
    assert_eq!(stats.paid_orders, 1);
    assert_eq!(stats.pending_orders, 2);
    assert_eq!(stats.cancelled_orders, 1);

    let this_month = Utc::now().month();
    assert_eq!(stats.monthly_sales.len(), 1);
    assert_eq!(stats.monthly_sales[0].month, this_month);
    assert_eq!(stats.monthly_sales[0].count, 3);
}

#[tokio::test]
async fn graph_stats_fill_the_revenue_series_and_tag_slices() {
    let store = MemoryStore::new();
    let shoes = seed_category(&store, "Shoes").await;
    let hats = seed_category(&store, "Hats").await;
    let runner = seed_product(&store, shoes.id, "Runner", 100, 50).await;
    seed_product(&store, hats.id, "Fedora", 50, 10).await;

    store
        .place_order(order_request(vec![(runner.id, 3)], 300, 799))
        .await
        .unwrap();
    store
        .place_order(order_request(vec![(runner.id, 1)], 100, 599))
        .await
        .unwrap();

    let now = Utc::now();
    let raw = store.graph_stats(now).await.unwrap();
    assert_eq!(raw.total_orders, 2);
    assert_eq!(raw.active_customers, 2);
    assert_eq!(raw.daily_sales, 799 + 599);
    assert_eq!(raw.monthly_sales, 799 + 599);
    assert_eq!(raw.yearly_sales, 799 + 599);
    assert_eq!(raw.top_products[0].name, "Runner");
    assert_eq!(raw.top_products[0].total_sold, 4);

    let stats = format_graph_stats(raw);
    assert_eq!(stats.revenue.len(), 12);
    let this_month = &stats.revenue[now.month0() as usize];
    assert_eq!(this_month.revenue, 799 + 599);
    assert_eq!(stats.top_selling_products, "Runner");

    // category breakdown covers both categories with cycled colors
    assert_eq!(stats.categories.len(), 2);
    assert_eq!(stats.categories[0].name, "Shoes");
    assert_eq!(stats.categories[0].value, 1);
    assert!(stats.categories[0].color.starts_with('#'));

    // both orders were cash on delivery
    assert_eq!(stats.payment_methods.len(), 1);
    assert_eq!(stats.payment_methods[0].name, "Cash on Delivery");
    assert_eq!(stats.payment_methods[0].value, 2);
}

#[tokio::test]
async fn recent_orders_are_newest_first_and_flattened() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 50).await;

    for _ in 0..3 {
        store
            .place_order(order_request(vec![(product.id, 1)], 100, 599))
            .await
            .unwrap();
    }

    let rows = store.recent_orders(2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].order_number, "eb003");
    assert_eq!(rows[1].order_number, "eb002");
    assert_eq!(rows[0].customer_name, "Jane Doe");
    assert_eq!(rows[0].amount, 599);
    assert_eq!(rows[0].status, OrderStatus::Pending);
    assert_eq!(rows[0].date, Utc::now().format("%Y-%m-%d").to_string());
}
