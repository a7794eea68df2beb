pub mod catalog;
pub mod customer;
pub mod error;
pub mod order;
pub mod schedule;

pub use error::ValidationError;
