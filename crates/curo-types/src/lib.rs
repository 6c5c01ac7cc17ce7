//! Curo Types - Shared domain types
//!
//! This crate contains domain types used across Curo services:
//! - User identity
//! - Treatment categories and plan classification
//! - Subscription, payment, delivery, and approval status enums

pub mod category;
pub mod error;
pub mod status;
pub mod user;

pub use category::*;
pub use error::*;
pub use status::*;
pub use user::*;
