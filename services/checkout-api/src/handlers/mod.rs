//! REST API handlers

pub mod checkout;
pub mod health;
pub mod webhook;

pub use checkout::*;
pub use health::*;
pub use webhook::*;
