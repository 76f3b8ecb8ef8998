//! Order entity, status machine, and order-number format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::product::ProductCard;
use super::shipping::ShippingData;

pub const DEFAULT_SHIPPING_FEE: i64 = 499;
pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by user";

/// Formats the human-readable display identifier for the `seq`-th order.
/// Zero-padded to three digits, growing naturally past `eb999`.
pub fn format_order_number(seq: u64) -> String {
    format!("eb{seq:03}")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position along the fulfilment line; `Cancelled` sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Processing => Some(2),
            Self::Dispatched => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// Forward moves (including skips) are allowed, cancellation is allowed
    /// from any non-terminal state, and nothing leaves `Delivered` or
    /// `Cancelled`. Re-asserting the current status is a no-op and allowed.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (Self::Delivered, _) | (Self::Cancelled, _) => false,
            (_, Self::Cancelled) => true,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Dispatched => "dispatched",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cod,
    Bank,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Bank => "bank",
        }
    }

    /// The label the dashboard charts use.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Bank => "Bank Transfer",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "bank" => Ok(Self::Bank),
            other => Err(format!("unknown payment type: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub qty: i32,
}

/// A persisted line item. The product reference goes `None` when the
/// product is deleted after the order was placed; the order itself is kept.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRef {
    pub product_id: Option<Uuid>,
    pub qty: i32,
}

impl From<OrderItem> for OrderItemRef {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: Some(item.product_id),
            qty: item.qty,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub items: Vec<OrderItemRef>,
    pub shipping_data: ShippingData,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item with its product populated, the shape the confirmation page
/// reads (`items[0].productId.name`). The product is `None` when it has
/// been deleted since the order was placed.
#[derive(Clone, Debug, Serialize)]
pub struct PopulatedOrderItem {
    #[serde(rename = "productId")]
    pub product: Option<ProductCard>,
    pub qty: i32,
}

/// An order with both its shipping record and its products populated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_number: String,
    pub items: Vec<PopulatedOrderItem>,
    pub shipping_data: ShippingData,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_zero_padded() {
        assert_eq!(format_order_number(1), "eb001");
        assert_eq!(format_order_number(42), "eb042");
        assert_eq!(format_order_number(999), "eb999");
        assert_eq!(format_order_number(1000), "eb1000");
    }

    #[test]
    fn forward_transitions_are_allowed() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Dispatched));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Dispatched.can_transition_to(Delivered));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        use OrderStatus::*;
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Dispatched));
        assert!(!Processing.can_transition_to(Confirmed));
    }

    #[test]
    fn cancellation_reaches_every_non_terminal_state() {
        use OrderStatus::*;
        for from in [Pending, Confirmed, Processing, Dispatched] {
            assert!(from.can_transition_to(Cancelled), "{from} should cancel");
        }
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_are_sticky() {
        use OrderStatus::*;
        for to in [Pending, Confirmed, Processing, Dispatched, Delivered] {
            assert!(!Cancelled.can_transition_to(to));
        }
        assert!(!Delivered.can_transition_to(Pending));
        // re-asserting the current state is a no-op
        assert!(Delivered.can_transition_to(Delivered));
        assert!(Cancelled.can_transition_to(Cancelled));
    }
}
