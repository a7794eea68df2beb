//! pies-hex: order-tracking bot core (dialogues, reminders) plus inbound adapters

pub mod config;
pub mod errors;

pub mod application;

pub use pies_types::{domain, ports};

pub mod inbound; // Telegram long polling + health endpoint
