//! Catalog invariants: category uniqueness/referential checks and the
//! inventory mirror.

mod common;

use common::{order_request, seed_category, seed_product};
use ebazaar::domain::category::CategoryUpdate;
use ebazaar::domain::product::ProductUpdate;
use ebazaar::store::{CatalogStore, MemoryStore, OrderStore};

#[tokio::test]
async fn category_name_lookup_is_case_insensitive() {
    let store = MemoryStore::new();
    let shoes = seed_category(&store, "Shoes").await;

    let hit = store
        .find_category_by_name("shoes", None)
        .await
        .unwrap()
        .expect("case-insensitive duplicate should be found");
    assert_eq!(hit.id, shoes.id);

    // excluding the record itself clears the way for self-updates
    assert!(store
        .find_category_by_name("SHOES", Some(shoes.id))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn referencing_products_are_counted_before_deletion() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    seed_product(&store, category.id, "Runner", 100, 5).await;

    assert_eq!(
        store.count_products_in_category(category.id).await.unwrap(),
        1
    );

    let empty = seed_category(&store, "Hats").await;
    assert_eq!(store.count_products_in_category(empty.id).await.unwrap(), 0);
    store.delete_category(empty.id).await.unwrap();
    assert!(store.get_category(empty.id).await.unwrap().is_none());
}

#[tokio::test]
async fn admin_inventory_overwrite_keeps_the_mirror_in_sync() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let updated = store
        .set_product_quantity(product.id, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.inventory.quantity(), 0);
    assert!(!updated.inventory.in_stock());

    let updated = store
        .set_product_quantity(product.id, 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.inventory.quantity(), 7);
    assert!(updated.inventory.in_stock());
}

#[tokio::test]
async fn product_update_routes_quantity_through_the_mutator() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let updated = store
        .update_product(
            product.id,
            ProductUpdate {
                quantity: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.inventory.in_stock());
}

#[tokio::test]
async fn renaming_a_category_refreshes_product_references() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    store
        .update_category(
            category.id,
            CategoryUpdate {
                name: Some("Footwear".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.category.name, "Footwear");
}

#[tokio::test]
async fn deleting_a_product_keeps_the_order_with_a_nulled_reference() {
    let store = MemoryStore::new();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;
    store
        .place_order(order_request(vec![(product.id, 2)], 200, 699))
        .await
        .unwrap();

    assert!(store.delete_product(product.id).await.unwrap());

    let detail = store
        .get_order_by_number("eb001")
        .await
        .unwrap()
        .expect("order survives product deletion");
    assert_eq!(detail.items.len(), 1);
    assert!(detail.items[0].product.is_none());
    assert_eq!(detail.items[0].qty, 2);
}
