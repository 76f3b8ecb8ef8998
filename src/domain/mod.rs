//! Domain entities and the rules that bind them.

pub mod category;
pub mod order;
pub mod product;
pub mod shipping;
pub mod user;

pub use category::Category;
pub use order::{Order, OrderStatus, PaymentStatus, PaymentType};
pub use product::{Inventory, Product, ProductStatus};
pub use shipping::ShippingData;
pub use user::{Role, User};

use serde::{Deserialize, Serialize};

/// A stored image: the public URL, its alt text, and the identifier the
/// backing image store deletes it by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
    pub public_id: String,
}
