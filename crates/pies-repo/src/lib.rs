#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use chrono::NaiveDateTime;
use pies_types::domain::customer::{Customer, CustomerId, NewCustomer};
use pies_types::domain::order::{NewOrder, OrderId, OrderWithCustomer};
use pies_types::ports::store::{RepoError, Store};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// `DATABASE_URL` value selecting the in-memory store.
pub const MEMORY_URL: &str = "memory";

pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    /// `None` or [`MEMORY_URL`] picks the in-memory store, anything else is a SQLite URL.
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) if url != MEMORY_URL => Self::sqlite(url).await,
            _ => Self::memory(),
        }
    }

    #[cfg(feature = "sqlite")]
    async fn sqlite(url: &str) -> anyhow::Result<Self> {
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    #[cfg(not(feature = "sqlite"))]
    async fn sqlite(url: &str) -> anyhow::Result<Self> {
        anyhow::bail!("built without the `sqlite` feature, cannot open {url}")
    }

    #[cfg(feature = "memory")]
    fn memory() -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(not(feature = "memory"))]
    fn memory() -> anyhow::Result<Self> {
        anyhow::bail!("built without the `memory` feature, set DATABASE_URL to a sqlite url")
    }
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

#[async_trait::async_trait]
impl Store for Repo {
    async fn create_customer(&self, customer: NewCustomer) -> Result<CustomerId, RepoError> {
        dispatch!(self, r => r.create_customer(customer).await)
    }

    async fn find_customers(&self, query: &str) -> Result<Vec<Customer>, RepoError> {
        dispatch!(self, r => r.find_customers(query).await)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepoError> {
        dispatch!(self, r => r.get_customer(id).await)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, RepoError> {
        dispatch!(self, r => r.list_customers().await)
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderId, RepoError> {
        dispatch!(self, r => r.create_order(order).await)
    }

    async fn list_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        dispatch!(self, r => r.list_orders(start, end).await)
    }

    async fn list_new_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        dispatch!(self, r => r.list_new_orders(start, end).await)
    }

    async fn mark_reminded(&self, id: OrderId) -> Result<bool, RepoError> {
        dispatch!(self, r => r.mark_reminded(id).await)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, RepoError> {
        dispatch!(self, r => r.delete_order(id).await)
    }
}
