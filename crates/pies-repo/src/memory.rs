use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use pies_types::domain::customer::{Customer, CustomerId, NewCustomer};
use pies_types::domain::order::{NewOrder, Order, OrderId, OrderStatus, OrderWithCustomer};
use pies_types::ports::store::{RepoError, Store};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct InMemoryRepo {
    customers: Arc<DashMap<CustomerId, Customer>>,
    orders: Arc<DashMap<OrderId, Order>>,
    next_customer: Arc<AtomicI64>,
    next_order: Arc<AtomicI64>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            customers: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
            next_customer: Arc::new(AtomicI64::new(1)),
            next_order: Arc::new(AtomicI64::new(1)),
        }
    }

    fn joined<F>(&self, keep: F) -> Vec<OrderWithCustomer>
    where
        F: Fn(&Order) -> bool,
    {
        let mut rows: Vec<OrderWithCustomer> = self
            .orders
            .iter()
            .filter(|kv| keep(kv.value()))
            .filter_map(|kv| {
                let order = kv.value().clone();
                let customer = self.customers.get(&order.customer_id)?;
                Some(OrderWithCustomer {
                    customer_name: customer.name.clone(),
                    customer_phone: customer.phone.clone(),
                    order,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.order.delivery_at, r.order.id));
        rows
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryRepo {
    async fn create_customer(&self, customer: NewCustomer) -> Result<CustomerId, RepoError> {
        let id = CustomerId(self.next_customer.fetch_add(1, Ordering::SeqCst));
        self.customers.insert(
            id,
            Customer {
                id,
                name: customer.name,
                phone: customer.phone,
            },
        );
        Ok(id)
    }

    async fn find_customers(&self, query: &str) -> Result<Vec<Customer>, RepoError> {
        let mut found: Vec<Customer> = self
            .customers
            .iter()
            .filter(|kv| kv.value().matches(query))
            .map(|kv| kv.value().clone())
            .collect();
        found.sort_by_key(|c| c.id);
        Ok(found)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepoError> {
        Ok(self.customers.get(&id).map(|r| r.clone()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, RepoError> {
        let mut all: Vec<Customer> = self.customers.iter().map(|kv| kv.value().clone()).collect();
        all.sort_by_key(|c| c.id);
        Ok(all)
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderId, RepoError> {
        if !self.customers.contains_key(&order.customer_id) {
            return Err(RepoError::MissingCustomer(order.customer_id));
        }
        let id = OrderId(self.next_order.fetch_add(1, Ordering::SeqCst));
        self.orders.insert(
            id,
            Order {
                id,
                customer_id: order.customer_id,
                address: order.address,
                items: order.items,
                created_at: Local::now().naive_local(),
                delivery_at: order.delivery_at,
                total_price: order.total_price,
                status: OrderStatus::New,
            },
        );
        Ok(id)
    }

    async fn list_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        Ok(self.joined(|o| start <= o.delivery_at && o.delivery_at <= end))
    }

    async fn list_new_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        Ok(self.joined(|o| {
            o.status == OrderStatus::New && start <= o.delivery_at && o.delivery_at <= end
        }))
    }

    async fn mark_reminded(&self, id: OrderId) -> Result<bool, RepoError> {
        if let Some(mut o) = self.orders.get_mut(&id) {
            if o.status == OrderStatus::New {
                o.status = OrderStatus::Reminded;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, RepoError> {
        Ok(self.orders.remove(&id).is_some())
    }
}
