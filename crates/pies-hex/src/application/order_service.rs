use crate::errors::AppError;
use chrono::{Local, NaiveDateTime};
use pies_types::domain::catalog::Catalog;
use pies_types::domain::customer::{Customer, CustomerId, NewCustomer};
use pies_types::domain::order::{LineItem, NewOrder, OrderId, OrderWithCustomer};
use pies_types::domain::schedule::{DateRange, LookaheadWindow};
use pies_types::ports::store::Store;

/// Store operations with catalog validation and pricing applied on the way in.
pub struct OrderService<S: Store> {
    store: S,
    catalog: Catalog,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S, catalog: Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn create_customer(&self, name: &str, phone: &str) -> Result<CustomerId, AppError> {
        let customer = NewCustomer::new(name, phone)?;
        let id = self.store.create_customer(customer).await?;
        tracing::info!(customer_id = %id, "customer created");
        Ok(id)
    }

    pub async fn find_customers(&self, query: &str) -> Result<Vec<Customer>, AppError> {
        Ok(self.store.find_customers(query.trim()).await?)
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.store.list_customers().await?)
    }

    /// Validates items against the catalog, fixes the total and persists the order.
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        address: String,
        items: Vec<LineItem>,
        delivery_at: NaiveDateTime,
    ) -> Result<(OrderId, NewOrder), AppError> {
        let order = NewOrder::new(customer_id, address, items, delivery_at, &self.catalog)?;
        if delivery_at < Local::now().naive_local() {
            tracing::debug!(%customer_id, %delivery_at, "order delivery time is in the past");
        }
        let id = self.store.create_order(order.clone()).await?;
        tracing::info!(order_id = %id, %customer_id, total = order.total_price, "order created");
        Ok((id, order))
    }

    pub async fn list_orders(&self, range: DateRange) -> Result<Vec<OrderWithCustomer>, AppError> {
        Ok(self.store.list_orders(range.start, range.end).await?)
    }

    /// Returns whether an order was removed; a missing id is not an error.
    pub async fn delete_order(&self, id: OrderId) -> Result<bool, AppError> {
        let deleted = self.store.delete_order(id).await?;
        tracing::info!(order_id = %id, deleted, "delete order");
        Ok(deleted)
    }

    /// Orders still `new` whose delivery falls inside the window ahead of `now`.
    pub async fn list_upcoming(
        &self,
        now: NaiveDateTime,
        window: LookaheadWindow,
    ) -> Result<Vec<OrderWithCustomer>, AppError> {
        let range = window.range_from(now);
        Ok(self.store.list_new_orders(range.start, range.end).await?)
    }

    pub async fn mark_reminded(&self, id: OrderId) -> Result<bool, AppError> {
        Ok(self.store.mark_reminded(id).await?)
    }
}
