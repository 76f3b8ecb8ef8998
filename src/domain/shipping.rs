//! Shipping/contact record captured once per order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Denormalized per-order shipping record. Immutable once written; repeat
/// customers get a fresh record on every checkout.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingData {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: Option<String>,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The checkout payload; validated at the boundary before anything is
/// persisted.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPayload {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    pub zip_code: Option<String>,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

impl ShippingData {
    pub fn new(payload: ShippingPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_owned(),
            email: payload
                .email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            phone: payload.phone.trim().to_owned(),
            address: payload.address.trim().to_owned(),
            city: payload.city.trim().to_owned(),
            zip_code: payload
                .zip_code
                .map(|z| z.trim().to_owned())
                .filter(|z| !z.is_empty()),
            country: payload.country.trim().to_owned(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ShippingPayload {
        ShippingPayload {
            name: " Jane Doe ".into(),
            email: Some("Jane@Example.com".into()),
            phone: "0300-1234567".into(),
            address: "12 Mall Road".into(),
            city: "Lahore".into(),
            zip_code: None,
            country: "Pakistan".into(),
        }
    }

    #[test]
    fn new_trims_and_lowercases() {
        let data = ShippingData::new(payload());
        assert_eq!(data.name, "Jane Doe");
        assert_eq!(data.email.as_deref(), Some("jane@example.com"));
        assert!(data.zip_code.is_none());
    }

    #[test]
    fn missing_required_field_fails_validation() {
        let mut p = payload();
        p.city = String::new();
        assert!(p.validate().is_err());
    }
}
