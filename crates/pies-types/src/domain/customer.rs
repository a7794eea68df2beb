use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
}

impl Customer {
    /// Case-insensitive substring match against name or phone.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q) || self.phone.to_lowercase().contains(&q)
    }
}

/// Customer fields before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
}

impl NewCustomer {
    pub fn new(name: &str, phone: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let phone = phone.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if phone.is_empty() {
            return Err(ValidationError::EmptyField("phone"));
        }
        Ok(Self {
            name: name.to_string(),
            phone: phone.to_string(),
        })
    }
}
