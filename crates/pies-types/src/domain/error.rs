use chrono::NaiveDate;
use thiserror::Error;

/// Malformed operator input. Always recoverable: the caller re-prompts in place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown catalog item: {0}")]
    UnknownItem(String),

    #[error("quantity must be a positive integer, got {0:?}")]
    BadQuantity(String),

    #[error("order has no items")]
    EmptyItems,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("cannot parse {input:?}, expected {expected}")]
    BadDate {
        input: String,
        expected: &'static str,
    },

    #[error("range end {end} is before start {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid order id {0:?}")]
    BadOrderId(String),
}
