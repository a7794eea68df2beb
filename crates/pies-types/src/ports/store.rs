use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::customer::{Customer, CustomerId, NewCustomer};
use crate::domain::order::{NewOrder, OrderId, OrderWithCustomer};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("customer {0} does not exist")]
    MissingCustomer(CustomerId),
}

/// Customers and orders. Every method is its own unit of work.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn create_customer(&self, customer: NewCustomer) -> Result<CustomerId, RepoError>;
    async fn find_customers(&self, query: &str) -> Result<Vec<Customer>, RepoError>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepoError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, RepoError>;

    async fn create_order(&self, order: NewOrder) -> Result<OrderId, RepoError>;
    /// Orders delivered within `[start, end]`, by delivery time then id.
    async fn list_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError>;
    /// Same range filter as `list_orders`, restricted to orders still in status `new`.
    async fn list_new_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError>;
    async fn mark_reminded(&self, id: OrderId) -> Result<bool, RepoError>;
    async fn delete_order(&self, id: OrderId) -> Result<bool, RepoError>;
}
