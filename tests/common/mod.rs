//! Shared fixtures for the integration suite.

use uuid::Uuid;

use ebazaar::domain::category::NewCategory;
use ebazaar::domain::order::OrderItem;
use ebazaar::domain::product::NewProduct;
use ebazaar::domain::shipping::ShippingPayload;
use ebazaar::domain::{Category, ImageRef, PaymentType, Product, ProductStatus};
use ebazaar::store::{CatalogStore, MemoryStore, NewOrder};

pub fn image(name: &str) -> ImageRef {
    ImageRef {
        url: format!("null://categories/{name}.jpg"),
        alt: name.to_owned(),
        public_id: format!("categories/{name}.jpg"),
    }
}

pub async fn seed_category(store: &MemoryStore, name: &str) -> Category {
    store
        .insert_category(NewCategory {
            name: name.to_owned(),
            description: String::new(),
            image: Some(image(name)),
            is_active: true,
            featured: false,
            display_order: 0,
        })
        .await
        .expect("insert category")
}

pub async fn seed_product(
    store: &MemoryStore,
    category_id: Uuid,
    name: &str,
    price: i64,
    quantity: i32,
) -> Product {
    store
        .insert_product(NewProduct {
            name: name.to_owned(),
            description: format!("{name} description"),
            price,
            discount_percent: 0.0,
            category_id,
            images: vec![],
            quantity,
            status: ProductStatus::Active,
        })
        .await
        .expect("insert product")
}

pub fn shipping_payload() -> ShippingPayload {
    ShippingPayload {
        name: "Jane Doe".into(),
        email: Some("jane@example.com".into()),
        phone: "0300-1234567".into(),
        address: "12 Mall Road".into(),
        city: "Lahore".into(),
        zip_code: Some("54000".into()),
        country: "Pakistan".into(),
    }
}

pub fn order_request(items: Vec<(Uuid, i32)>, subtotal: i64, total: i64) -> NewOrder {
    NewOrder {
        items: items
            .into_iter()
            .map(|(product_id, qty)| OrderItem { product_id, qty })
            .collect(),
        shipping: shipping_payload(),
        payment_type: PaymentType::Cod,
        subtotal,
        shipping_fee: 499,
        total,
    }
}
