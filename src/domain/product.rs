//! Product entity and its inventory invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ImageRef;

pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 1000;

/// Stock counter plus the persisted `inStock` mirror.
///
/// Invariant: `in_stock == (quantity > 0)` after every mutation. The fields
/// are private so the only way to write them is through [`Inventory::new`]
/// and [`Inventory::set_quantity`], which keep the pair in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    quantity: i32,
    in_stock: bool,
}

impl Inventory {
    pub fn new(quantity: i32) -> Self {
        let quantity = quantity.max(0);
        Self {
            quantity,
            in_stock: quantity > 0,
        }
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    pub fn set_quantity(&mut self, quantity: i32) {
        *self = Self::new(quantity);
    }

    /// Removes `qty` units if available. Returns `false` (leaving the
    /// inventory untouched) when the request exceeds the current stock.
    pub fn try_take(&mut self, qty: i32) -> bool {
        if qty > self.quantity {
            return false;
        }
        self.set_quantity(self.quantity - qty);
        true
    }

    /// Returns `qty` units to stock (order cancellation).
    pub fn restock(&mut self, qty: i32) {
        self.set_quantity(self.quantity.saturating_add(qty));
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// The category fields products are served with.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub discount_percent: f64,
    pub category: CategoryRef,
    pub images: Vec<ImageRef>,
    pub inventory: Inventory,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The projection listed under a category and inside populated order items.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub images: Vec<ImageRef>,
    pub inventory: Inventory,
}

impl From<&Product> for ProductCard {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            images: p.images.clone(),
            inventory: p.inventory,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub discount_percent: f64,
    pub category_id: Uuid,
    pub images: Vec<ImageRef>,
    pub quantity: i32,
    pub status: ProductStatus,
}

/// Partial update; `None` leaves the field untouched. `images`, when set,
/// is the full replacement list (deletions and uploads already applied by
/// the handler).
#[derive(Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub discount_percent: Option<f64>,
    pub category_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
    pub images: Option<Vec<ImageRef>>,
    pub quantity: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_stock_mirrors_quantity() {
        let mut inv = Inventory::new(5);
        assert!(inv.in_stock());
        inv.set_quantity(0);
        assert!(!inv.in_stock());
        inv.set_quantity(-3);
        assert_eq!(inv.quantity(), 0);
        assert!(!inv.in_stock());
        inv.restock(2);
        assert!(inv.in_stock());
    }

    #[test]
    fn try_take_guards_the_lower_bound() {
        let mut inv = Inventory::new(3);
        assert!(inv.try_take(3));
        assert_eq!(inv.quantity(), 0);
        assert!(!inv.in_stock());
        assert!(!inv.try_take(1));
        assert_eq!(inv.quantity(), 0);
    }

    #[test]
    fn taking_part_of_the_stock_stays_in_stock() {
        let mut inv = Inventory::new(5);
        assert!(inv.try_take(3));
        assert_eq!(inv.quantity(), 2);
        assert!(inv.in_stock());
    }
}
