//! Storage abstraction.
//!
//! Handlers talk to these traits through `Arc<dyn Store>`; the Postgres
//! implementation backs production and the in-memory implementation backs
//! the test suite. Both must agree on behavior: the integration tests in
//! `tests/` pin the contract.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::dashboard::{GraphStatsRaw, RecentOrderRow, SalesStats};
use crate::domain::category::{CategoryUpdate, NewCategory};
use crate::domain::order::{Order, OrderDetail, OrderItem};
use crate::domain::product::{NewProduct, ProductCard, ProductUpdate};
use crate::domain::shipping::ShippingPayload;
use crate::domain::user::NewUser;
use crate::domain::{
    Category, OrderStatus, PaymentStatus, PaymentType, Product, ShippingData, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// A prospective order, validated at the HTTP boundary.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub shipping: ShippingPayload,
    pub payment_type: PaymentType,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("Product not found with ID: {0}")]
    ProductNotFound(Uuid),
    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StatusUpdateError {
    #[error("Order not found")]
    OrderNotFound,
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CancelOrderError {
    #[error("Order not found")]
    OrderNotFound,
    #[error("Cannot cancel delivered orders")]
    AlreadyDelivered,
    #[error("Order is already cancelled")]
    AlreadyCancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum InsertUserError {
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.into())
    }
}

impl From<sqlx::Error> for StatusUpdateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.into())
    }
}

impl From<sqlx::Error> for CancelOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.into())
    }
}

impl From<sqlx::Error> for InsertUserError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.into())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    /// Parses the `sort` query string (`-createdAt` style); unknown values
    /// fall back to newest-first.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "createdAt" => Self::CreatedAsc,
            "price" => Self::PriceAsc,
            "-price" => Self::PriceDesc,
            "name" => Self::NameAsc,
            "-name" => Self::NameDesc,
            _ => Self::CreatedDesc,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProductFilter {
    pub page: i64,
    pub limit: i64,
    /// Case-insensitive substring match on the category name.
    pub category_name: Option<String>,
    pub featured: Option<bool>,
    /// Case-insensitive substring match on product name/description.
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: ProductSort,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category_name: None,
            featured: None,
            search: None,
            min_price: None,
            max_price: None,
            sort: ProductSort::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub total_active: i64,
}

#[derive(Clone, Debug)]
pub struct OrderFilter {
    pub page: i64,
    pub limit: i64,
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring match over order number, payment type,
    /// and payment status.
    pub search: Option<String>,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            search: None,
        }
    }
}

/// Flattened listing row for the admin orders table.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryRow {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    pub amount: i64,
    pub status: OrderStatus,
    /// `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrderPage {
    pub rows: Vec<OrderSummaryRow>,
    pub pagination: Pagination,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_active_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    /// Case-insensitive exact-name lookup, optionally excluding one id (the
    /// record being updated).
    async fn find_category_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count_products_in_category(&self, category_id: Uuid) -> Result<i64, StoreError>;
    /// Active products of a category, in the card projection.
    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductCard>, StoreError>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError>;
    async fn newest_products(&self, limit: i64) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError>;
    /// Returns whether a product was actually removed.
    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Admin inventory overwrite; routes through the centralized quantity
    /// mutator so `inStock` stays consistent.
    async fn set_product_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The checkout workflow: pre-validates every line item, then persists
    /// the shipping record, decrements stock, and inserts the order in one
    /// atomic step. A failure on any item leaves every product untouched.
    async fn place_order(&self, new: NewOrder) -> Result<Order, PlaceOrderError>;
    /// Lookup by the human-readable display identifier (`eb001`), fully
    /// populated.
    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderDetail>, StoreError>;
    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError>;
    /// Partial status/paymentStatus update by internal id; status moves are
    /// checked against the transition table. Moving into `cancelled` takes
    /// the cancellation path (restock included).
    async fn update_order_status(
        &self,
        id: Uuid,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, StatusUpdateError>;
    /// Cancels a non-delivered order and returns its line items to stock.
    async fn cancel_order(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Order, CancelOrderError>;
    async fn get_shipping_data(&self, id: Uuid) -> Result<Option<ShippingData>, StoreError>;
}

#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn sales_stats(&self) -> Result<SalesStats, StoreError>;
    /// `now` anchors the daily/monthly/yearly windows so reports are
    /// reproducible in tests.
    async fn graph_stats(&self, now: DateTime<Utc>) -> Result<GraphStatsRaw, StoreError>;
    async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrderRow>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> Result<User, InsertUserError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Option<User>, StoreError>;
    async fn list_active_users(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), StoreError>;
    async fn deactivate_user(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Everything the app needs from storage, behind one object-safe bound.
pub trait Store: CatalogStore + OrderStore + DashboardStore + UserStore {}

impl<T: CatalogStore + OrderStore + DashboardStore + UserStore> Store for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_math() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);

        let first = Pagination::new(1, 10, 5);
        assert_eq!(first.total_pages, 1);
        assert!(!first.has_next_page);
        assert!(!first.has_prev_page);
    }

    #[test]
    fn sort_parsing_falls_back_to_newest() {
        assert_eq!(ProductSort::parse("-createdAt"), ProductSort::CreatedDesc);
        assert_eq!(ProductSort::parse("price"), ProductSort::PriceAsc);
        assert_eq!(ProductSort::parse("-name"), ProductSort::NameDesc);
        assert_eq!(ProductSort::parse("garbage"), ProductSort::CreatedDesc);
    }
}
