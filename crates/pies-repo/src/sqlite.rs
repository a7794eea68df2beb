use async_trait::async_trait;
use chrono::NaiveDateTime;
use pies_types::domain::customer::{Customer, CustomerId, NewCustomer};
use pies_types::domain::order::{
    LineItem, NewOrder, Order, OrderId, OrderStatus, OrderWithCustomer,
};
use pies_types::ports::store::{RepoError, Store};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

/// Column text format for timestamps; sorts lexicographically in time order.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_customers",
        include_str!("../migrations/0001_create_customers.sql"),
    ),
    (
        "0002_create_orders",
        include_str!("../migrations/0002_create_orders.sql"),
    ),
    (
        "0003_orders_delivery_index",
        include_str!("../migrations/0003_orders_delivery_index.sql"),
    ),
];

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.address, o.items_json, o.created_at, \
     o.delivery_at, o.total_price, o.status, c.name AS customer_name, c.phone AS customer_phone";

pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbCustomer {
    id: i64,
    name: String,
    phone: String,
}

impl From<DbCustomer> for Customer {
    fn from(r: DbCustomer) -> Self {
        Customer {
            id: CustomerId(r.id),
            name: r.name,
            phone: r.phone,
        }
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    customer_id: i64,
    address: String,
    items_json: String,
    created_at: String,
    delivery_at: String,
    total_price: i64,
    status: String,
    customer_name: String,
    customer_phone: String,
}

fn db_err(e: impl ToString) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn parse_ts(s: &str) -> Result<NaiveDateTime, RepoError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).map_err(db_err)
}

impl DbOrder {
    fn into_order(self) -> Result<OrderWithCustomer, RepoError> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| RepoError::DbError(format!("unknown order status {:?}", self.status)))?;
        let items: Vec<LineItem> = serde_json::from_str(&self.items_json).map_err(db_err)?;
        Ok(OrderWithCustomer {
            order: Order {
                id: OrderId(self.id),
                customer_id: CustomerId(self.customer_id),
                address: self.address,
                items,
                created_at: parse_ts(&self.created_at)?,
                delivery_at: parse_ts(&self.delivery_at)?,
                total_price: self.total_price,
                status,
            },
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for (name, ddl) in MIGRATIONS {
            sqlx::query(ddl)
                .execute(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("migration {name} failed: {e}"))?;
        }
        tracing::debug!(database_url, "sqlite store ready");

        Ok(Self { pool })
    }

    async fn select_orders(
        &self,
        filter: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN customers c ON o.customer_id = c.id
             WHERE o.delivery_at BETWEEN ? AND ? {filter}
             ORDER BY o.delivery_at, o.id"
        );
        let rows: Vec<DbOrder> = sqlx::query_as(&sql)
            .bind(start.format(TS_FORMAT).to_string())
            .bind(end.format(TS_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait]
impl Store for SqliteRepo {
    async fn create_customer(&self, customer: NewCustomer) -> Result<CustomerId, RepoError> {
        let res = sqlx::query("INSERT INTO customers (name, phone) VALUES (?, ?)")
            .bind(&customer.name)
            .bind(&customer.phone)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(CustomerId(res.last_insert_rowid()))
    }

    // SQLite's LIKE folds ASCII only, so matching happens on our side to
    // keep Cyrillic names case-insensitive.
    async fn find_customers(&self, query: &str) -> Result<Vec<Customer>, RepoError> {
        Ok(self
            .list_customers()
            .await?
            .into_iter()
            .filter(|c| c.matches(query))
            .collect())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepoError> {
        let row: Option<DbCustomer> =
            sqlx::query_as("SELECT id, name, phone FROM customers WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(Customer::from))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, RepoError> {
        let rows: Vec<DbCustomer> =
            sqlx::query_as("SELECT id, name, phone FROM customers ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderId, RepoError> {
        let items_json = serde_json::to_string(&order.items).map_err(db_err)?;
        let res = sqlx::query(
            "INSERT INTO orders (customer_id, address, items_json, delivery_at, total_price, status)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.customer_id.0)
        .bind(&order.address)
        .bind(items_json)
        .bind(order.delivery_at.format(TS_FORMAT).to_string())
        .bind(order.total_price)
        .bind(OrderStatus::New.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation()) {
                RepoError::MissingCustomer(order.customer_id)
            } else {
                db_err(e)
            }
        })?;
        Ok(OrderId(res.last_insert_rowid()))
    }

    async fn list_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        self.select_orders("", start, end).await
    }

    async fn list_new_orders(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OrderWithCustomer>, RepoError> {
        self.select_orders("AND o.status = 'new'", start, end).await
    }

    async fn mark_reminded(&self, id: OrderId) -> Result<bool, RepoError> {
        let res = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
            .bind(OrderStatus::Reminded.as_str())
            .bind(id.0)
            .bind(OrderStatus::New.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}
