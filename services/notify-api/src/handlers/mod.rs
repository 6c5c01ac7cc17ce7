//! REST API handlers

pub mod health;
pub mod notifications;

pub use health::*;
pub use notifications::*;
