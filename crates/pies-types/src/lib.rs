//! pies-types: domain model and ports shared by the store adapters and the bot core

pub mod domain;
pub mod ports;
