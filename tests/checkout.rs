//! Checkout workflow: stock validation, atomicity, order numbering.

mod common;

use common::{order_request, seed_category, seed_product};
use ebazaar::domain::{OrderStatus, PaymentStatus};
use ebazaar::store::{CatalogStore, MemoryStore, OrderStore, PlaceOrderError};

#[tokio::test]
async fn placing_an_order_decrements_stock_and_keeps_in_stock_in_sync() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let order = store
        .place_order(order_request(vec![(product.id, 3)], 300, 799))
        .await
        .expect("order should be placed");

    assert_eq!(order.order_number, "eb001");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.subtotal, 300);
    assert_eq!(order.shipping, 499);
    assert_eq!(order.total, 799);
    assert_eq!(order.shipping_data.name, "Jane Doe");

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 2);
    assert!(product.inventory.in_stock());
}

#[tokio::test]
async fn order_numbers_are_sequential_and_unique() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 50).await;

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let order = store
            .place_order(order_request(vec![(product.id, 1)], 100, 599))
            .await
            .unwrap();
        numbers.push(order.order_number);
    }
    assert_eq!(numbers, vec!["eb001", "eb002", "eb003"]);
}

#[tokio::test]
async fn out_of_stock_product_rejects_and_stays_untouched() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Soldout", 100, 0).await;

    let err = store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .expect_err("should be rejected");
    assert!(err.to_string().contains("Insufficient stock"));
    assert!(err.to_string().contains("Soldout"));

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 0);
    assert!(!product.inventory.in_stock());
}

#[tokio::test]
async fn failing_item_leaves_every_other_item_untouched() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let p1 = seed_product(&store, category.id, "Plenty", 100, 5).await;
    let p2 = seed_product(&store, category.id, "Scarce", 100, 1).await;

    let err = store
        .place_order(order_request(vec![(p1.id, 2), (p2.id, 5)], 700, 1199))
        .await
        .expect_err("second item should fail the order");
    assert!(matches!(err, PlaceOrderError::InsufficientStock(ref name) if name == "Scarce"));

    // strict behavior: the earlier, valid item is not decremented either
    let p1 = store.get_product(p1.id).await.unwrap().unwrap();
    let p2 = store.get_product(p2.id).await.unwrap().unwrap();
    assert_eq!(p1.inventory.quantity(), 5);
    assert_eq!(p2.inventory.quantity(), 1);
}

#[tokio::test]
async fn duplicate_line_items_are_validated_against_combined_stock() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let err = store
        .place_order(order_request(vec![(product.id, 3), (product.id, 3)], 600, 1099))
        .await
        .expect_err("combined quantity exceeds stock");
    assert!(matches!(err, PlaceOrderError::InsufficientStock(_)));

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 5);
}

#[tokio::test]
async fn unknown_product_names_the_offending_id() {
    let store = MemoryStore::new();
    let missing = uuid::Uuid::new_v4();

    let err = store
        .place_order(order_request(vec![(missing, 1)], 100, 599))
        .await
        .expect_err("unknown product");
    assert!(matches!(err, PlaceOrderError::ProductNotFound(id) if id == missing));
    assert!(err.to_string().contains(&missing.to_string()));
}

#[tokio::test]
async fn lookup_by_order_number_populates_product_and_shipping() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;
    store
        .place_order(order_request(vec![(product.id, 3)], 300, 799))
        .await
        .unwrap();

    let detail = store
        .get_order_by_number("eb001")
        .await
        .unwrap()
        .expect("order should be found");
    assert_eq!(detail.shipping_data.name, "Jane Doe");
    let populated = detail.items[0].product.as_ref().expect("populated product");
    assert_eq!(populated.name, "Runner");
    assert_eq!(populated.price, 100);

    assert!(store.get_order_by_number("eb999").await.unwrap().is_none());
}

#[tokio::test]
async fn every_checkout_creates_a_fresh_shipping_record() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 10).await;

    let first = store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .unwrap();
    let second = store
        .place_order(order_request(vec![(product.id, 1)], 100, 599))
        .await
        .unwrap();

    // identical payloads, no dedup
    assert_ne!(first.shipping_data.id, second.shipping_data.id);
    assert!(store
        .get_shipping_data(first.shipping_data.id)
        .await
        .unwrap()
        .is_some());
}
