//! Postgres store.
//!
//! The checkout workflow runs inside a single transaction: line items are
//! locked and validated first, then stock is decremented with a lower-bound
//! guard, so a failure anywhere rolls the whole order back and two orders
//! contending for the last unit cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::dashboard::{
    self, GraphStatsRaw, MonthlySalesRow, RecentOrderRow, SalesStats, TopProductRow,
};
use crate::domain::category::{CategoryUpdate, NewCategory};
use crate::domain::order::{
    format_order_number, Order, OrderDetail, OrderItemRef, PopulatedOrderItem,
    DEFAULT_CANCEL_REASON,
};
use crate::domain::product::{CategoryRef, NewProduct, ProductCard, ProductUpdate};
use crate::domain::user::NewUser;
use crate::domain::{
    Category, ImageRef, Inventory, OrderStatus, PaymentStatus, PaymentType, Product,
    ShippingData, User,
};

use super::{
    CancelOrderError, CatalogStore, DashboardStore, InsertUserError, NewOrder, OrderFilter,
    OrderPage, OrderStore, OrderSummaryRow, Pagination, PlaceOrderError, ProductFilter,
    ProductPage, ProductSort, StatusUpdateError, StoreError, UserStore,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse<T>(raw: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(StoreError::Backend)
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: String,
    image: Option<Json<ImageRef>>,
    is_active: bool,
    featured: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image.map(|Json(image)| image),
            is_active: row.is_active,
            featured: row.featured,
            display_order: row.display_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CATEGORY_SELECT: &str = "SELECT id, name, description, image, is_active, featured, \
     display_order, created_at, updated_at FROM categories";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    discount_percent: f64,
    category_id: Uuid,
    category_name: String,
    category_description: String,
    images: Json<Vec<ImageRef>>,
    quantity: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            discount_percent: row.discount_percent,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
                description: row.category_description,
            },
            images: row.images.0,
            inventory: Inventory::new(row.quantity),
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.price, \
     p.discount_percent, p.category_id, c.name AS category_name, \
     c.description AS category_description, p.images, p.quantity, p.status, \
     p.created_at, p.updated_at \
     FROM products p JOIN categories c ON c.id = p.category_id";

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE p.status = 'active'");
    if let Some(category) = &filter.category_name {
        qb.push(" AND c.name ILIKE ")
            .push_bind(format!("%{}%", category.trim()));
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND c.featured = ").push_bind(featured);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
}

#[derive(sqlx::FromRow)]
struct ShippingRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: String,
    address: String,
    city: String,
    zip_code: Option<String>,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShippingRow> for ShippingData {
    fn from(row: ShippingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            zip_code: row.zip_code,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SHIPPING_SELECT: &str = "SELECT id, name, email, phone, address, city, zip_code, \
     country, created_at, updated_at FROM shipping_data";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    shipping_data_id: Uuid,
    payment_type: String,
    payment_status: String,
    status: String,
    subtotal: i64,
    shipping: i64,
    total: i64,
    cancel_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ORDER_SELECT: &str = "SELECT id, order_number, shipping_data_id, payment_type, \
     payment_status, status, subtotal, shipping, total, cancel_reason, cancelled_at, \
     created_at, updated_at FROM orders";

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: Option<Uuid>,
    qty: i32,
}

impl PgStore {
    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn category_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!("{CATEGORY_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemRef>, StoreError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT product_id, qty FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| OrderItemRef {
                product_id: row.product_id,
                qty: row.qty,
            })
            .collect())
    }

    async fn order_from_row(&self, row: OrderRow) -> Result<Order, StoreError> {
        let shipping = sqlx::query_as::<_, ShippingRow>(&format!(
            "{SHIPPING_SELECT} WHERE id = $1"
        ))
        .bind(row.shipping_data_id)
        .fetch_one(&self.pool)
        .await?;
        let items = self.order_items(row.id).await?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            items,
            shipping_data: shipping.into(),
            payment_type: parse(&row.payment_type)?,
            payment_status: parse(&row.payment_status)?,
            status: parse(&row.status)?,
            subtotal: row.subtotal,
            shipping: row.shipping,
            total: row.total,
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Returns every line item of an order to stock, inside the caller's
/// transaction. Items whose product has since been deleted are skipped.
async fn restock_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<(), sqlx::Error> {
    // aggregate first: UPDATE .. FROM applies at most one joined row per
    // target, which would lose duplicate products across line items
    sqlx::query(
        "UPDATE products p \
         SET quantity = p.quantity + agg.qty, \
             in_stock = (p.quantity + agg.qty) > 0, \
             updated_at = NOW() \
         FROM (SELECT product_id, SUM(qty)::INT AS qty FROM order_items \
               WHERE order_id = $1 AND product_id IS NOT NULL \
               GROUP BY product_id) agg \
         WHERE agg.product_id = p.id",
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn mark_cancelled(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    reason: Option<String>,
) -> Result<(), sqlx::Error> {
    restock_items(tx, order_id).await?;
    sqlx::query(
        "UPDATE orders SET status = 'cancelled', cancel_reason = $2, \
         cancelled_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(order_id)
    .bind(reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_owned()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_active_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_SELECT} WHERE is_active = TRUE \
             ORDER BY display_order ASC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.category_by_id(id).await
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Category>, StoreError> {
        let mut qb = QueryBuilder::new(CATEGORY_SELECT);
        qb.push(" WHERE LOWER(name) = LOWER(")
            .push_bind(name.trim().to_owned())
            .push(")");
        if let Some(id) = exclude {
            qb.push(" AND id <> ").push_bind(id);
        }
        let row = qb
            .build_query_as::<CategoryRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let category = Category::new(new);
        sqlx::query(
            "INSERT INTO categories (id, name, description, image, is_active, featured, \
             display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.image.as_ref().map(Json))
        .bind(category.is_active)
        .bind(category.featured)
        .bind(category.display_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError> {
        let Some(mut category) = self.category_by_id(id).await? else {
            return Ok(None);
        };
        category.apply(update);
        sqlx::query(
            "UPDATE categories SET name = $2, description = $3, image = $4, \
             is_active = $5, featured = $6, display_order = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.image.as_ref().map(Json))
        .bind(category.is_active)
        .bind(category.featured)
        .bind(category.display_order)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(Some(category))
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_products_in_category(&self, category_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductCard>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct CardRow {
            id: Uuid,
            name: String,
            price: i64,
            images: Json<Vec<ImageRef>>,
            quantity: i32,
        }
        let rows = sqlx::query_as::<_, CardRow>(
            "SELECT id, name, price, images, quantity FROM products \
             WHERE category_id = $1 AND status = 'active' ORDER BY created_at DESC",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ProductCard {
                id: row.id,
                name: row.name,
                price: row.price,
                images: row.images.0,
                inventory: Inventory::new(row.quantity),
            })
            .collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError> {
        let mut qb = QueryBuilder::new(PRODUCT_SELECT);
        push_product_filters(&mut qb, filter);
        qb.push(match filter.sort {
            ProductSort::CreatedDesc => " ORDER BY p.created_at DESC",
            ProductSort::CreatedAsc => " ORDER BY p.created_at ASC",
            ProductSort::PriceAsc => " ORDER BY p.price ASC",
            ProductSort::PriceDesc => " ORDER BY p.price DESC",
            ProductSort::NameAsc => " ORDER BY p.name ASC",
            ProductSort::NameDesc => " ORDER BY p.name DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(filter.limit.max(0))
            .push(" OFFSET ")
            .push_bind((filter.page - 1).max(0) * filter.limit);
        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;
        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id",
        );
        push_product_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let total_active = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductPage {
            products,
            total,
            total_active,
        })
    }

    async fn newest_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} ORDER BY p.created_at DESC LIMIT $1"
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        self.product_by_id(id).await
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let id = Uuid::new_v4();
        let inventory = Inventory::new(new.quantity);
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO products (id, name, description, price, discount_percent, \
             category_id, images, quantity, in_stock, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.discount_percent)
        .bind(new.category_id)
        .bind(Json(&new.images))
        .bind(inventory.quantity())
        .bind(inventory.in_stock())
        .bind(new.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.product_by_id(id)
            .await?
            .ok_or_else(|| StoreError::backend("freshly inserted product vanished"))
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let Some(current) = self.product_by_id(id).await? else {
            return Ok(None);
        };
        let category_id = update.category_id.unwrap_or(current.category.id);
        let inventory = update
            .quantity
            .map(Inventory::new)
            .unwrap_or(current.inventory);
        sqlx::query(
            "UPDATE products SET name = $2, description = $3, price = $4, \
             discount_percent = $5, category_id = $6, images = $7, quantity = $8, \
             in_stock = $9, status = $10, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(update.name.as_ref().unwrap_or(&current.name))
        .bind(update.description.as_ref().unwrap_or(&current.description))
        .bind(update.price.unwrap_or(current.price))
        .bind(update.discount_percent.unwrap_or(current.discount_percent))
        .bind(category_id)
        .bind(Json(update.images.as_ref().unwrap_or(&current.images)))
        .bind(inventory.quantity())
        .bind(inventory.in_stock())
        .bind(update.status.unwrap_or(current.status).as_str())
        .execute(&self.pool)
        .await?;
        self.product_by_id(id).await
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_product_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, StoreError> {
        let inventory = Inventory::new(quantity);
        let result = sqlx::query(
            "UPDATE products SET quantity = $2, in_stock = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(inventory.quantity())
        .bind(inventory.in_stock())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.product_by_id(id).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, new: NewOrder) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        // lock and validate every line item before touching stock
        #[derive(sqlx::FromRow)]
        struct StockRow {
            name: String,
            quantity: i32,
        }
        let mut names: HashMap<Uuid, String> = HashMap::new();
        for item in &new.items {
            let row = sqlx::query_as::<_, StockRow>(
                "SELECT name, quantity FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PlaceOrderError::ProductNotFound(item.product_id))?;
            if row.quantity < item.qty {
                return Err(PlaceOrderError::InsufficientStock(row.name));
            }
            names.insert(item.product_id, row.name);
        }

        let shipping_data = ShippingData::new(new.shipping);
        sqlx::query(
            "INSERT INTO shipping_data (id, name, email, phone, address, city, zip_code, \
             country, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(shipping_data.id)
        .bind(&shipping_data.name)
        .bind(&shipping_data.email)
        .bind(&shipping_data.phone)
        .bind(&shipping_data.address)
        .bind(&shipping_data.city)
        .bind(&shipping_data.zip_code)
        .bind(&shipping_data.country)
        .bind(shipping_data.created_at)
        .bind(shipping_data.updated_at)
        .execute(&mut *tx)
        .await?;

        // guarded decrement; the rows are locked, but the lower bound stays
        // in the statement so stock can never go negative
        for item in &new.items {
            let result = sqlx::query(
                "UPDATE products SET quantity = quantity - $2, \
                 in_stock = (quantity - $2) > 0, updated_at = NOW() \
                 WHERE id = $1 AND quantity >= $2",
            )
            .bind(item.product_id)
            .bind(item.qty)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                let name = names
                    .remove(&item.product_id)
                    .unwrap_or_else(|| item.product_id.to_string());
                return Err(PlaceOrderError::InsufficientStock(name));
            }
        }

        let seq = sqlx::query_scalar::<_, i64>("SELECT nextval('order_numbers')")
            .fetch_one(&mut *tx)
            .await?;
        let order_number = format_order_number(seq.unsigned_abs());

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO orders (id, order_number, shipping_data_id, payment_type, \
             payment_status, status, subtotal, shipping, total, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'pending', 'pending', $5, $6, $7, $8, $9)",
        )
        .bind(order_id)
        .bind(&order_number)
        .bind(shipping_data.id)
        .bind(new.payment_type.as_str())
        .bind(new.subtotal)
        .bind(new.shipping_fee)
        .bind(new.total)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, item) in new.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, qty, position) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.qty)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            order_number,
            items: new.items.into_iter().map(Into::into).collect(),
            shipping_data,
            payment_type: new.payment_type,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            subtotal: new.subtotal,
            shipping: new.shipping_fee,
            total: new.total,
            cancel_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderDetail>, StoreError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        #[derive(sqlx::FromRow)]
        struct DetailRow {
            qty: i32,
            product_id: Option<Uuid>,
            name: Option<String>,
            price: Option<i64>,
            images: Option<Json<Vec<ImageRef>>>,
            quantity: Option<i32>,
        }
        let item_rows = sqlx::query_as::<_, DetailRow>(
            "SELECT oi.qty, p.id AS product_id, p.name, p.price, p.images, p.quantity \
             FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id \
             WHERE oi.order_id = $1 ORDER BY oi.position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        let items = item_rows
            .into_iter()
            .map(|r| PopulatedOrderItem {
                product: match (r.product_id, r.name, r.price) {
                    (Some(id), Some(name), Some(price)) => Some(ProductCard {
                        id,
                        name,
                        price,
                        images: r.images.map(|Json(images)| images).unwrap_or_default(),
                        inventory: Inventory::new(r.quantity.unwrap_or(0)),
                    }),
                    _ => None,
                },
                qty: r.qty,
            })
            .collect();

        let shipping = sqlx::query_as::<_, ShippingRow>(&format!(
            "{SHIPPING_SELECT} WHERE id = $1"
        ))
        .bind(row.shipping_data_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(OrderDetail {
            id: row.id,
            order_number: row.order_number,
            items,
            shipping_data: shipping.into(),
            payment_type: parse(&row.payment_type)?,
            payment_status: parse(&row.payment_status)?,
            status: parse(&row.status)?,
            subtotal: row.subtotal,
            shipping: row.shipping,
            total: row.total,
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError> {
        fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
            qb.push(" WHERE TRUE");
            if let Some(status) = filter.status {
                qb.push(" AND o.status = ").push_bind(status.as_str());
            }
            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (o.order_number ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR o.payment_type ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR o.payment_status ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        #[derive(sqlx::FromRow)]
        struct ListRow {
            id: Uuid,
            order_number: String,
            customer_name: String,
            email: Option<String>,
            phone: String,
            payment_type: String,
            payment_status: String,
            total: i64,
            status: String,
            created_at: DateTime<Utc>,
        }

        let mut qb = QueryBuilder::new(
            "SELECT o.id, o.order_number, s.name AS customer_name, s.email, s.phone, \
             o.payment_type, o.payment_status, o.total, o.status, o.created_at \
             FROM orders o JOIN shipping_data s ON s.id = o.shipping_data_id",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY o.created_at DESC LIMIT ")
            .push_bind(filter.limit.max(0))
            .push(" OFFSET ")
            .push_bind((filter.page - 1).max(0) * filter.limit);
        let rows = qb.build_query_as::<ListRow>().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM orders o JOIN shipping_data s ON s.id = o.shipping_data_id",
        );
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let rows = rows
            .into_iter()
            .map(|row| {
                Ok(OrderSummaryRow {
                    id: row.id,
                    order_number: row.order_number,
                    customer_name: row.customer_name,
                    email: row.email.unwrap_or_else(|| "No Email".to_owned()),
                    phone: row.phone,
                    payment_type: parse(&row.payment_type)?,
                    payment_status: parse(&row.payment_status)?,
                    amount: row.total,
                    status: parse(&row.status)?,
                    date: row.created_at.format("%Y-%m-%d").to_string(),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(OrderPage {
            rows,
            pagination: Pagination::new(filter.page, filter.limit, total),
        })
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, StatusUpdateError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StatusUpdateError::OrderNotFound)?;
        let current: OrderStatus = parse(&row.status).map_err(StoreError::from)?;

        if let Some(next) = status {
            if !current.can_transition_to(next) {
                return Err(StatusUpdateError::InvalidTransition {
                    from: current,
                    to: next,
                });
            }
            if next == OrderStatus::Cancelled && current != OrderStatus::Cancelled {
                mark_cancelled(&mut tx, id, None).await?;
            } else {
                sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                    .bind(id)
                    .bind(next.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
        }
        if let Some(payment) = payment_status {
            sqlx::query(
                "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(payment.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        self.order_from_row(row).await.map_err(Into::into)
    }

    async fn cancel_order(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Order, CancelOrderError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CancelOrderError::OrderNotFound)?;
        match parse::<OrderStatus>(&row.status).map_err(StoreError::from)? {
            OrderStatus::Delivered => return Err(CancelOrderError::AlreadyDelivered),
            OrderStatus::Cancelled => return Err(CancelOrderError::AlreadyCancelled),
            _ => {}
        }
        mark_cancelled(&mut tx, id, reason).await?;
        tx.commit().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        self.order_from_row(row).await.map_err(Into::into)
    }

    async fn get_shipping_data(&self, id: Uuid) -> Result<Option<ShippingData>, StoreError> {
        let row = sqlx::query_as::<_, ShippingRow>(&format!("{SHIPPING_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl DashboardStore for PgStore {
    async fn sales_stats(&self) -> Result<SalesStats, StoreError> {
        #[derive(sqlx::FromRow)]
        struct TotalsRow {
            total_orders: i64,
            total_sales: i64,
            paid_orders: i64,
            pending_orders: i64,
            cancelled_orders: i64,
        }
        let totals = sqlx::query_as::<_, TotalsRow>(
            "SELECT COUNT(*) AS total_orders, \
             COALESCE(SUM(total), 0)::BIGINT AS total_sales, \
             COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid_orders, \
             COUNT(*) FILTER (WHERE payment_status = 'pending') AS pending_orders, \
             COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders \
             FROM orders",
        )
        .fetch_one(&self.pool)
        .await?;

        #[derive(sqlx::FromRow)]
        struct MonthRow {
            month: i32,
            total: i64,
            count: i64,
        }
        let months = sqlx::query_as::<_, MonthRow>(
            "SELECT EXTRACT(MONTH FROM created_at)::INT AS month, \
             COALESCE(SUM(total), 0)::BIGINT AS total, COUNT(*) AS count \
             FROM orders GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesStats {
            total_orders: totals.total_orders,
            total_sales: totals.total_sales,
            paid_orders: totals.paid_orders,
            pending_orders: totals.pending_orders,
            cancelled_orders: totals.cancelled_orders,
            monthly_sales: months
                .into_iter()
                .map(|m| MonthlySalesRow {
                    month: m.month.max(0) as u32,
                    total: m.total,
                    count: m.count,
                })
                .collect(),
        })
    }

    async fn graph_stats(&self, now: DateTime<Utc>) -> Result<GraphStatsRaw, StoreError> {
        let (day, month, year) = dashboard::window_starts(now);

        #[derive(sqlx::FromRow)]
        struct TotalsRow {
            total_orders: i64,
            active_customers: i64,
            daily_sales: i64,
            monthly_sales: i64,
            yearly_sales: i64,
        }
        let totals = sqlx::query_as::<_, TotalsRow>(
            "SELECT COUNT(*) AS total_orders, \
             COUNT(DISTINCT shipping_data_id) AS active_customers, \
             COALESCE(SUM(total) FILTER (WHERE created_at >= $1), 0)::BIGINT AS daily_sales, \
             COALESCE(SUM(total) FILTER (WHERE created_at >= $2), 0)::BIGINT AS monthly_sales, \
             COALESCE(SUM(total) FILTER (WHERE created_at >= $3), 0)::BIGINT AS yearly_sales \
             FROM orders",
        )
        .bind(day)
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        #[derive(sqlx::FromRow)]
        struct RevenueRow {
            month: i32,
            revenue: i64,
        }
        let revenue = sqlx::query_as::<_, RevenueRow>(
            "SELECT EXTRACT(MONTH FROM created_at)::INT AS month, \
             COALESCE(SUM(total), 0)::BIGINT AS revenue \
             FROM orders GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        #[derive(sqlx::FromRow)]
        struct CategoryCountRow {
            name: String,
            count: i64,
        }
        let categories = sqlx::query_as::<_, CategoryCountRow>(
            "SELECT c.name, COUNT(p.id) AS count \
             FROM categories c LEFT JOIN products p ON p.category_id = c.id \
             GROUP BY c.id, c.name ORDER BY MIN(c.created_at)",
        )
        .fetch_all(&self.pool)
        .await?;

        #[derive(sqlx::FromRow)]
        struct PaymentCountRow {
            payment_type: String,
            count: i64,
        }
        let payments = sqlx::query_as::<_, PaymentCountRow>(
            "SELECT payment_type, COUNT(*) AS count FROM orders \
             GROUP BY payment_type ORDER BY payment_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let top = sqlx::query_as::<_, (String, i64)>(
            "SELECT p.name, SUM(oi.qty)::BIGINT AS total_sold \
             FROM order_items oi JOIN products p ON p.id = oi.product_id \
             GROUP BY p.id, p.name ORDER BY total_sold DESC, p.name ASC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(GraphStatsRaw {
            total_orders: totals.total_orders,
            active_customers: totals.active_customers,
            daily_sales: totals.daily_sales,
            monthly_sales: totals.monthly_sales,
            yearly_sales: totals.yearly_sales,
            revenue_by_month: revenue
                .into_iter()
                .map(|r| (r.month.max(0) as u32, r.revenue))
                .collect(),
            category_counts: categories.into_iter().map(|c| (c.name, c.count)).collect(),
            payment_counts: payments
                .into_iter()
                .map(|p| Ok((parse::<PaymentType>(&p.payment_type)?, p.count)))
                .collect::<Result<Vec<_>, StoreError>>()?,
            top_products: top
                .into_iter()
                .map(|(name, total_sold)| TopProductRow { name, total_sold })
                .collect(),
        })
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrderRow>, StoreError> {
        let page = self
            .list_orders(&OrderFilter {
                page: 1,
                limit,
                status: None,
                search: None,
            })
            .await?;
        Ok(page
            .rows
            .into_iter()
            .map(|row| RecentOrderRow {
                id: row.id,
                order_number: row.order_number,
                customer_name: row.customer_name,
                email: row.email,
                phone: row.phone,
                payment_type: row.payment_type,
                amount: row.amount,
                status: row.status,
                date: row.date,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    refresh_token: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse(&row.role)?,
            refresh_token: row.refresh_token,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_SELECT: &str = "SELECT id, name, email, password_hash, role, refresh_token, \
     is_active, created_at, updated_at FROM users";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, InsertUserError> {
        let user = User::new(new);
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Err(InsertUserError::DuplicateEmail);
        }
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, refresh_token, \
             is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.refresh_token)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(
            "UPDATE users SET name = COALESCE($2, name), \
             email = COALESCE(LOWER($3), email), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .execute(&self.pool)
        .await?;
        self.get_user(id).await
    }

    async fn list_active_users(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE is_active = TRUE ORDER BY created_at DESC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit.max(0))
        .bind((page - 1).max(0) * limit)
        .fetch_all(&self.pool)
        .await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE is_active = TRUE",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((users, total))
    }

    async fn deactivate_user(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
