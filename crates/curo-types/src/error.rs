//! Common error types

use thiserror::Error;

/// Errors from parsing domain values out of stored or wire text
#[derive(Error, Debug)]
pub enum ParseError {
    /// Unknown category slug
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Unknown status value
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}
