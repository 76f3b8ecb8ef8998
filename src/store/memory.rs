//! In-memory store.
//!
//! Backs the test suite (and local tinkering) with the same contract as the
//! Postgres store. A single mutex over the whole state makes every
//! operation atomic by construction, the checkout workflow included.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
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
    Category, Inventory, OrderStatus, PaymentStatus, PaymentType, Product, ShippingData, User,
};

use super::{
    CancelOrderError, CatalogStore, DashboardStore, InsertUserError, NewOrder, OrderFilter,
    OrderPage, OrderStore, OrderSummaryRow, Pagination, PlaceOrderError, ProductFilter,
    ProductPage, ProductSort, StatusUpdateError, StoreError, UserStore,
};

#[derive(Clone, Debug)]
struct StoredOrder {
    id: Uuid,
    order_number: String,
    items: Vec<OrderItemRef>,
    shipping_data_id: Uuid,
    payment_type: PaymentType,
    payment_status: PaymentStatus,
    status: OrderStatus,
    subtotal: i64,
    shipping: i64,
    total: i64,
    cancel_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    /// Creation order; newest-first reads iterate in reverse.
    orders: Vec<StoredOrder>,
    shipping: HashMap<Uuid, ShippingData>,
    users: HashMap<Uuid, User>,
    order_seq: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn category_ref(&self, id: Uuid) -> Option<CategoryRef> {
        self.categories.get(&id).map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
            description: c.description.clone(),
        })
    }

    fn order_to_domain(&self, stored: &StoredOrder) -> Result<Order, StoreError> {
        let shipping_data = self
            .shipping
            .get(&stored.shipping_data_id)
            .cloned()
            .ok_or_else(|| StoreError::backend("shipping record missing for order"))?;
        Ok(Order {
            id: stored.id,
            order_number: stored.order_number.clone(),
            items: stored.items.clone(),
            shipping_data,
            payment_type: stored.payment_type,
            payment_status: stored.payment_status,
            status: stored.status,
            subtotal: stored.subtotal,
            shipping: stored.shipping,
            total: stored.total,
            cancel_reason: stored.cancel_reason.clone(),
            cancelled_at: stored.cancelled_at,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn summary_row(&self, stored: &StoredOrder) -> OrderSummaryRow {
        let shipping = self.shipping.get(&stored.shipping_data_id);
        OrderSummaryRow {
            id: stored.id,
            order_number: stored.order_number.clone(),
            customer_name: shipping
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Unknown Customer".to_owned()),
            email: shipping
                .and_then(|s| s.email.clone())
                .unwrap_or_else(|| "No Email".to_owned()),
            phone: shipping
                .map(|s| s.phone.clone())
                .unwrap_or_else(|| "No Phone".to_owned()),
            payment_type: stored.payment_type,
            payment_status: stored.payment_status,
            amount: stored.total,
            status: stored.status,
            date: stored.created_at.format("%Y-%m-%d").to_string(),
        }
    }

    /// Returns each line item of `stored` to stock. Products deleted since
    /// the order was placed are skipped.
    fn restock_items(&mut self, items: &[OrderItemRef]) {
        let now = Utc::now();
        for item in items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            if let Some(product) = self.products.get_mut(&product_id) {
                product.inventory.restock(item.qty);
                product.updated_at = now;
            }
        }
    }

    fn cancel(&mut self, index: usize, reason: Option<String>) {
        let now = Utc::now();
        let items = self.orders[index].items.clone();
        self.restock_items(&items);
        let order = &mut self.orders[index];
        order.status = OrderStatus::Cancelled;
        order.cancel_reason =
            Some(reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_owned()));
        order.cancelled_at = Some(now);
        order.updated_at = now;
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_active_categories(&self) -> Result<Vec<Category>, StoreError> {
        let inner = self.inner.lock().await;
        let mut cats: Vec<_> = inner
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        cats.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(cats)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.inner.lock().await.categories.get(&id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Category>, StoreError> {
        let needle = name.trim().to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
            .categories
            .values()
            .find(|c| c.name.to_lowercase() == needle && Some(c.id) != exclude)
            .cloned())
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let category = Category::new(new);
        let mut inner = self.inner.lock().await;
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<Option<Category>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(mut category) = inner.categories.get(&id).cloned() else {
            return Ok(None);
        };
        category.apply(update);
        inner.categories.insert(id, category.clone());
        // keep denormalized category refs on products current
        for product in inner.products.values_mut() {
            if product.category.id == id {
                product.category.name = category.name.clone();
                product.category.description = category.description.clone();
            }
        }
        Ok(Some(category))
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.lock().await.categories.remove(&id);
        Ok(())
    }

    async fn count_products_in_category(&self, category_id: Uuid) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .products
            .values()
            .filter(|p| p.category.id == category_id)
            .count() as i64)
    }

    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductCard>, StoreError> {
        use crate::domain::ProductStatus;
        let inner = self.inner.lock().await;
        let mut products: Vec<_> = inner
            .products
            .values()
            .filter(|p| p.category.id == category_id && p.status == ProductStatus::Active)
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products.into_iter().map(ProductCard::from).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError> {
        use crate::domain::ProductStatus;
        let inner = self.inner.lock().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let category = filter.category_name.as_ref().map(|s| s.to_lowercase());

        let mut matches: Vec<&Product> = inner
            .products
            .values()
            .filter(|p| p.status == ProductStatus::Active)
            .filter(|p| {
                category
                    .as_ref()
                    .map(|c| p.category.name.to_lowercase().contains(c))
                    .unwrap_or(true)
            })
            .filter(|p| {
                filter
                    .featured
                    .map(|want| {
                        inner
                            .categories
                            .get(&p.category.id)
                            .map(|c| c.featured == want)
                            .unwrap_or(false)
                    })
                    .unwrap_or(true)
            })
            .filter(|p| {
                search
                    .as_ref()
                    .map(|s| {
                        p.name.to_lowercase().contains(s)
                            || p.description.to_lowercase().contains(s)
                    })
                    .unwrap_or(true)
            })
            .filter(|p| filter.min_price.map(|min| p.price >= min).unwrap_or(true))
            .filter(|p| filter.max_price.map(|max| p.price <= max).unwrap_or(true))
            .collect();

        match filter.sort {
            ProductSort::CreatedDesc => matches.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::CreatedAsc => matches.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ProductSort::PriceAsc => matches.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => matches.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::NameAsc => matches.sort_by(|a, b| a.name.cmp(&b.name)),
            ProductSort::NameDesc => matches.sort_by(|a, b| b.name.cmp(&a.name)),
        }

        let total = matches.len() as i64;
        let total_active = inner
            .products
            .values()
            .filter(|p| p.status == ProductStatus::Active)
            .count() as i64;
        let skip = ((filter.page - 1).max(0) * filter.limit) as usize;
        let products = matches
            .into_iter()
            .skip(skip)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(ProductPage {
            products,
            total,
            total_active,
        })
    }

    async fn newest_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        let mut products: Vec<_> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products.truncate(limit.max(0) as usize);
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.inner.lock().await;
        let category = inner
            .category_ref(new.category_id)
            .ok_or_else(|| StoreError::backend("category does not exist"))?;
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            discount_percent: new.discount_percent,
            category,
            images: new.images,
            inventory: Inventory::new(new.quantity),
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let mut inner = self.inner.lock().await;
        let category = match update.category_id {
            Some(category_id) => Some(
                inner
                    .category_ref(category_id)
                    .ok_or_else(|| StoreError::backend("category does not exist"))?,
            ),
            None => None,
        };
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(discount_percent) = update.discount_percent {
            product.discount_percent = discount_percent;
        }
        if let Some(category) = category {
            product.category = category;
        }
        if let Some(status) = update.status {
            product.status = status;
        }
        if let Some(images) = update.images {
            product.images = images;
        }
        if let Some(quantity) = update.quantity {
            product.inventory.set_quantity(quantity);
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let removed = inner.products.remove(&id).is_some();
        if removed {
            // mirror the relational ON DELETE SET NULL on kept orders
            for order in &mut inner.orders {
                for item in &mut order.items {
                    if item.product_id == Some(id) {
                        item.product_id = None;
                    }
                }
            }
        }
        Ok(removed)
    }

    async fn set_product_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        product.inventory.set_quantity(quantity);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, new: NewOrder) -> Result<Order, PlaceOrderError> {
        let mut inner = self.inner.lock().await;

        // validate every line item before mutating anything; `remaining`
        // tracks stock across duplicate products so the decrement loop
        // below cannot fail halfway through
        let mut remaining: HashMap<Uuid, i32> = HashMap::new();
        for item in &new.items {
            let product = inner
                .products
                .get(&item.product_id)
                .ok_or(PlaceOrderError::ProductNotFound(item.product_id))?;
            let left = remaining
                .entry(item.product_id)
                .or_insert_with(|| product.inventory.quantity());
            if *left < item.qty {
                return Err(PlaceOrderError::InsufficientStock(product.name.clone()));
            }
            *left -= item.qty;
        }

        let now = Utc::now();
        for item in &new.items {
            if let Some(product) = inner.products.get_mut(&item.product_id) {
                let left = product.inventory.quantity() - item.qty;
                product.inventory.set_quantity(left);
                product.updated_at = now;
            }
        }

        let shipping_data = ShippingData::new(new.shipping);
        inner
            .shipping
            .insert(shipping_data.id, shipping_data.clone());

        inner.order_seq += 1;
        let stored = StoredOrder {
            id: Uuid::new_v4(),
            order_number: format_order_number(inner.order_seq),
            items: new.items.into_iter().map(Into::into).collect(),
            shipping_data_id: shipping_data.id,
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
        };
        inner.orders.push(stored.clone());
        inner.order_to_domain(&stored).map_err(Into::into)
    }

    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderDetail>, StoreError> {
        let inner = self.inner.lock().await;
        let Some(stored) = inner
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
        else {
            return Ok(None);
        };
        let shipping_data = inner
            .shipping
            .get(&stored.shipping_data_id)
            .cloned()
            .ok_or_else(|| StoreError::backend("shipping record missing for order"))?;
        let items = stored
            .items
            .iter()
            .map(|item| PopulatedOrderItem {
                product: item
                    .product_id
                    .and_then(|id| inner.products.get(&id))
                    .map(ProductCard::from),
                qty: item.qty,
            })
            .collect();
        Ok(Some(OrderDetail {
            id: stored.id,
            order_number: stored.order_number.clone(),
            items,
            shipping_data,
            payment_type: stored.payment_type,
            payment_status: stored.payment_status,
            status: stored.status,
            subtotal: stored.subtotal,
            shipping: stored.shipping,
            total: stored.total,
            cancel_reason: stored.cancel_reason.clone(),
            cancelled_at: stored.cancelled_at,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, StoreError> {
        let inner = self.inner.lock().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let matches: Vec<&StoredOrder> = inner
            .orders
            .iter()
            .rev()
            .filter(|o| filter.status.map(|s| o.status == s).unwrap_or(true))
            .filter(|o| {
                search
                    .as_ref()
                    .map(|s| {
                        o.order_number.to_lowercase().contains(s)
                            || o.payment_type.as_str().contains(s)
                            || o.payment_status.as_str().contains(s)
                    })
                    .unwrap_or(true)
            })
            .collect();

        let total = matches.len() as i64;
        let skip = ((filter.page - 1).max(0) * filter.limit) as usize;
        let rows = matches
            .into_iter()
            .skip(skip)
            .take(filter.limit.max(0) as usize)
            .map(|o| inner.summary_row(o))
            .collect();

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
        let mut inner = self.inner.lock().await;
        let index = inner
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(StatusUpdateError::OrderNotFound)?;

        if let Some(next) = status {
            let current = inner.orders[index].status;
            if !current.can_transition_to(next) {
                return Err(StatusUpdateError::InvalidTransition {
                    from: current,
                    to: next,
                });
            }
            if next == OrderStatus::Cancelled && current != OrderStatus::Cancelled {
                inner.cancel(index, None);
            } else {
                inner.orders[index].status = next;
            }
        }
        if let Some(payment) = payment_status {
            inner.orders[index].payment_status = payment;
        }
        inner.orders[index].updated_at = Utc::now();

        let stored = inner.orders[index].clone();
        inner.order_to_domain(&stored).map_err(Into::into)
    }

    async fn cancel_order(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Order, CancelOrderError> {
        let mut inner = self.inner.lock().await;
        let index = inner
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(CancelOrderError::OrderNotFound)?;
        match inner.orders[index].status {
            OrderStatus::Delivered => return Err(CancelOrderError::AlreadyDelivered),
            OrderStatus::Cancelled => return Err(CancelOrderError::AlreadyCancelled),
            _ => {}
        }
        inner.cancel(index, reason);
        let stored = inner.orders[index].clone();
        inner.order_to_domain(&stored).map_err(Into::into)
    }

    async fn get_shipping_data(&self, id: Uuid) -> Result<Option<ShippingData>, StoreError> {
        Ok(self.inner.lock().await.shipping.get(&id).cloned())
    }
}

#[async_trait]
impl DashboardStore for MemoryStore {
    async fn sales_stats(&self) -> Result<SalesStats, StoreError> {
        let inner = self.inner.lock().await;
        let mut monthly: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
        for order in &inner.orders {
            let entry = monthly.entry(order.created_at.month()).or_default();
            entry.0 += order.total;
            entry.1 += 1;
        }
        Ok(SalesStats {
            total_orders: inner.orders.len() as i64,
            total_sales: inner.orders.iter().map(|o| o.total).sum(),
            paid_orders: inner
                .orders
                .iter()
                .filter(|o| o.payment_status == PaymentStatus::Paid)
                .count() as i64,
            pending_orders: inner
                .orders
                .iter()
                .filter(|o| o.payment_status == PaymentStatus::Pending)
                .count() as i64,
            cancelled_orders: inner
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Cancelled)
                .count() as i64,
            monthly_sales: monthly
                .into_iter()
                .map(|(month, (total, count))| MonthlySalesRow {
                    month,
                    total,
                    count,
                })
                .collect(),
        })
    }

    async fn graph_stats(&self, now: DateTime<Utc>) -> Result<GraphStatsRaw, StoreError> {
        let inner = self.inner.lock().await;
        let (day, month, year) = dashboard::window_starts(now);

        let mut revenue: BTreeMap<u32, i64> = BTreeMap::new();
        let mut sold: HashMap<Uuid, i64> = HashMap::new();
        let mut customers: Vec<Uuid> = Vec::new();
        let (mut daily, mut monthly, mut yearly) = (0i64, 0i64, 0i64);

        for order in &inner.orders {
            *revenue.entry(order.created_at.month()).or_default() += order.total;
            if order.created_at >= day {
                daily += order.total;
            }
            if order.created_at >= month {
                monthly += order.total;
            }
            if order.created_at >= year {
                yearly += order.total;
            }
            if !customers.contains(&order.shipping_data_id) {
                customers.push(order.shipping_data_id);
            }
            for item in &order.items {
                if let Some(product_id) = item.product_id {
                    *sold.entry(product_id).or_default() += i64::from(item.qty);
                }
            }
        }

        let mut categories: Vec<&Category> = inner.categories.values().collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let category_counts = categories
            .into_iter()
            .map(|c| {
                let count = inner
                    .products
                    .values()
                    .filter(|p| p.category.id == c.id)
                    .count() as i64;
                (c.name.clone(), count)
            })
            .collect();

        let payment_counts = [PaymentType::Cod, PaymentType::Bank]
            .into_iter()
            .filter_map(|pt| {
                let count = inner
                    .orders
                    .iter()
                    .filter(|o| o.payment_type == pt)
                    .count() as i64;
                (count > 0).then_some((pt, count))
            })
            .collect();

        let mut top: Vec<TopProductRow> = sold
            .into_iter()
            .filter_map(|(product_id, total_sold)| {
                inner.products.get(&product_id).map(|p| TopProductRow {
                    name: p.name.clone(),
                    total_sold,
                })
            })
            .collect();
        top.sort_by(|a, b| b.total_sold.cmp(&a.total_sold).then(a.name.cmp(&b.name)));
        top.truncate(5);

        Ok(GraphStatsRaw {
            total_orders: inner.orders.len() as i64,
            active_customers: customers.len() as i64,
            daily_sales: daily,
            monthly_sales: monthly,
            yearly_sales: yearly,
            revenue_by_month: revenue.into_iter().collect(),
            category_counts,
            payment_counts,
            top_products: top,
        })
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrderRow>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|o| {
                let row = inner.summary_row(o);
                RecentOrderRow {
                    id: row.id,
                    order_number: row.order_number,
                    customer_name: row.customer_name,
                    email: row.email,
                    phone: row.phone,
                    payment_type: row.payment_type,
                    amount: row.amount,
                    status: row.status,
                    date: row.date,
                }
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, InsertUserError> {
        let mut inner = self.inner.lock().await;
        let email = new.email.trim().to_lowercase();
        if inner.users.values().any(|u| u.email == email) {
            return Err(InsertUserError::DuplicateEmail);
        }
        let user = User::new(new);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let needle = email.trim().to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == needle).cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&id) {
            user.refresh_token = token.map(str::to_owned);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email.trim().to_lowercase();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn list_active_users(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let inner = self.inner.lock().await;
        let mut users: Vec<_> = inner
            .users
            .values()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = users.len() as i64;
        let skip = ((page - 1).max(0) * limit) as usize;
        let users = users
            .into_iter()
            .skip(skip)
            .take(limit.max(0) as usize)
            .collect();
        Ok((users, total))
    }

    async fn deactivate_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&id) {
            user.is_active = false;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}
