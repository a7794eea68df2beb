use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::catalog::{Catalog, Price};
use crate::domain::customer::CustomerId;
use crate::domain::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl OrderId {
    /// Operator input such as `7` or `#7`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().trim_start_matches('#').parse::<i64>() {
            Ok(id) if id > 0 => Ok(OrderId(id)),
            _ => Err(ValidationError::BadOrderId(input.trim().to_string())),
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Reminded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Reminded => "reminded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(OrderStatus::New),
            "reminded" => Some(OrderStatus::Reminded),
            _ => None,
        }
    }
}

/// One catalog item with a positive quantity. Built through [`Catalog::line_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    name: String,
    quantity: u32,
}

impl LineItem {
    pub(crate) fn new_unchecked(name: String, quantity: u32) -> Self {
        Self { name, quantity }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.name, self.quantity)
    }
}

/// Parses operator quantity input: a strictly positive integer.
pub fn parse_quantity(input: &str) -> Result<u32, ValidationError> {
    let bad = || ValidationError::BadQuantity(input.trim().to_string());
    let n: i64 = input.trim().parse().map_err(|_| bad())?;
    if n <= 0 {
        return Err(bad());
    }
    u32::try_from(n).map_err(|_| bad())
}

/// A validated order ready for insertion. The total is fixed here and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub address: String,
    pub items: Vec<LineItem>,
    pub delivery_at: NaiveDateTime,
    pub total_price: Price,
}

impl NewOrder {
    pub fn new(
        customer_id: CustomerId,
        address: String,
        items: Vec<LineItem>,
        delivery_at: NaiveDateTime,
        catalog: &Catalog,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }
        let total_price = catalog.total(&items)?;
        Ok(Self {
            customer_id,
            address,
            items,
            delivery_at,
            total_price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub address: String,
    pub items: Vec<LineItem>,
    pub created_at: NaiveDateTime,
    pub delivery_at: NaiveDateTime,
    pub total_price: Price,
    pub status: OrderStatus,
}

/// Order joined with the owning customer's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithCustomer {
    pub order: Order,
    pub customer_name: String,
    pub customer_phone: String,
}
