pub mod chat;
pub mod dialogue;
pub mod messages;
pub mod order_service;
pub mod reminder;
pub mod router;
