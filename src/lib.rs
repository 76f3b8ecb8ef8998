//! ebazaar: apparel storefront and back-office REST API.
//!
//! ## What's here
//! - Product/category catalog with referential and uniqueness invariants
//! - Checkout workflow: validated, transactional inventory decrement plus
//!   sequential `eb###` order numbers
//! - Admin order-status state machine with restocking cancellation
//! - Dashboard aggregation endpoints for the admin charts
//! - JWT auth/session layer (access + rotating refresh tokens)
//!
//! Storage sits behind the traits in [`store`]; production runs on
//! Postgres, the test suite on the in-memory implementation.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod http;
pub mod images;
pub mod store;
