//! Admin order-status workflow: transitions, cancellation, restocking.

mod common;

use common::{order_request, seed_category, seed_product};
use ebazaar::domain::order::DEFAULT_CANCEL_REASON;
use ebazaar::domain::{OrderStatus, PaymentStatus};
use ebazaar::store::{
    CancelOrderError, CatalogStore, MemoryStore, OrderStore, StatusUpdateError,
};

async fn seeded_order(store: &MemoryStore) -> (uuid::Uuid, uuid::Uuid) {
    let category = seed_category(store, "Shoes").await;
    let product = seed_product(store, category.id, "Runner", 100, 5).await;
    let order = store
        .place_order(order_request(vec![(product.id, 3)], 300, 799))
        .await
        .unwrap();
    (order.id, product.id)
}

#[tokio::test]
async fn cancelling_a_pending_order_restocks_and_records_the_reason() {
    let store = MemoryStore::new();
    let (order_id, product_id) = seeded_order(&store).await;

    let order = store
        .cancel_order(order_id, Some("Changed my mind".into()))
        .await
        .expect("cancellation should succeed");
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.cancel_reason.as_deref(), Some("Changed my mind"));
    assert!(order.cancelled_at.is_some());

    let product = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 5);
    assert!(product.inventory.in_stock());
}

#[tokio::test]
async fn cancellation_reason_defaults_when_omitted() {
    let store = MemoryStore::new();
    let (order_id, _) = seeded_order(&store).await;

    let order = store.cancel_order(order_id, None).await.unwrap();
    assert_eq!(order.cancel_reason.as_deref(), Some(DEFAULT_CANCEL_REASON));
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let store = MemoryStore::new();
    let (order_id, product_id) = seeded_order(&store).await;
    store
        .update_order_status(order_id, Some(OrderStatus::Delivered), None)
        .await
        .unwrap();

    let err = store
        .cancel_order(order_id, None)
        .await
        .expect_err("delivered orders stay delivered");
    assert!(matches!(err, CancelOrderError::AlreadyDelivered));
    assert_eq!(err.to_string(), "Cannot cancel delivered orders");

    // no restock happened
    let product = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 2);
}

#[tokio::test]
async fn cancelling_twice_does_not_restock_twice() {
    let store = MemoryStore::new();
    let (order_id, product_id) = seeded_order(&store).await;

    store.cancel_order(order_id, None).await.unwrap();
    let err = store.cancel_order(order_id, None).await.expect_err("already cancelled");
    assert!(matches!(err, CancelOrderError::AlreadyCancelled));

    let product = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 5);
}

#[tokio::test]
async fn forward_transitions_apply_and_backward_ones_are_rejected() {
    let store = MemoryStore::new();
    let (order_id, _) = seeded_order(&store).await;

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Dispatched,
    ] {
        let order = store
            .update_order_status(order_id, Some(status), None)
            .await
            .unwrap();
        assert_eq!(order.status, status);
    }

    let err = store
        .update_order_status(order_id, Some(OrderStatus::Confirmed), None)
        .await
        .expect_err("backward move");
    assert!(matches!(
        err,
        StatusUpdateError::InvalidTransition {
            from: OrderStatus::Dispatched,
            to: OrderStatus::Confirmed,
        }
    ));
}

#[tokio::test]
async fn cancelling_through_the_status_endpoint_also_restocks() {
    let store = MemoryStore::new();
    let (order_id, product_id) = seeded_order(&store).await;

    let order = store
        .update_order_status(order_id, Some(OrderStatus::Cancelled), None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.cancelled_at.is_some());

    let product = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(product.inventory.quantity(), 5);
}

#[tokio::test]
async fn payment_status_updates_independently_of_status() {
    let store = MemoryStore::new();
    let (order_id, _) = seeded_order(&store).await;

    let order = store
        .update_order_status(order_id, None, Some(PaymentStatus::Paid))
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn unknown_order_is_reported_as_not_found() {
    let store = MemoryStore::new();
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        store.update_order_status(missing, Some(OrderStatus::Confirmed), None).await,
        Err(StatusUpdateError::OrderNotFound)
    ));
    assert!(matches!(
        store.cancel_order(missing, None).await,
        Err(CancelOrderError::OrderNotFound)
    ));
}
