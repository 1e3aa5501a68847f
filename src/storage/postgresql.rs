//! PostgreSQL expense storage.
//!
//! Every statement binds its values as parameters. Tags travel as a native
//! `TEXT[]` and come back as a `Vec<String>` in the same order.

use crate::models::{ExpenseRequest, ExpenseResponse};
use crate::storage::is_valid_table_name;
use crate::storage::migrations::{EXPENSE_MIGRATIONS, MigrationRunner, max_version};
use crate::storage::traits::ExpenseStorage;
use crate::{Error, Result};
use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// Columns returned by every read, in scan order.
const COLUMNS: &str = "id, title, amount, note, tags";

/// PostgreSQL-backed expense storage.
#[derive(Clone)]
pub struct PostgresExpenseStorage {
    /// Connection pool, shared by all in-flight requests.
    pool: Pool,
    /// Table holding the expenses.
    table_name: String,
}

fn pool_error(e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: "postgres_expenses_get_client".to_string(),
        cause: e.to_string(),
    }
}

fn query_error(op: &str, e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: op.to_string(),
        cause: e.to_string(),
    }
}

impl PostgresExpenseStorage {
    /// Default maximum connections in pool.
    pub const DEFAULT_POOL_MAX_SIZE: usize = 20;

    /// Connects to PostgreSQL and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or table name is invalid, the pool cannot
    /// be created, or a migration fails.
    pub async fn connect(
        connection_url: &str,
        table_name: impl Into<String>,
        pool_max_size: Option<usize>,
    ) -> Result<Self> {
        let storage = Self::new(connection_url, table_name, pool_max_size)?;
        storage.migrate().await?;
        Ok(storage)
    }

    /// Creates the storage without touching the database.
    ///
    /// Connections are opened lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or table name is invalid or the pool
    /// cannot be created.
    pub fn new(
        connection_url: &str,
        table_name: impl Into<String>,
        pool_max_size: Option<usize>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        if !is_valid_table_name(&table_name) {
            return Err(Error::InvalidInput(format!(
                "table name '{table_name}' is not a plain SQL identifier"
            )));
        }

        let config = Self::parse_connection_url(connection_url)?;
        let cfg = Self::build_pool_config(&config, pool_max_size);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| query_error("postgres_expenses_create_pool", e))?;

        Ok(Self { pool, table_name })
    }

    /// Returns the newest schema version this build knows about.
    #[must_use]
    pub fn latest_schema_version() -> i32 {
        max_version(EXPENSE_MIGRATIONS)
    }

    /// Applies pending schema migrations and returns the schema version.
    pub async fn migrate(&self) -> Result<i32> {
        MigrationRunner::new(self.pool.clone(), &self.table_name)
            .run(EXPENSE_MIGRATIONS)
            .await
    }

    /// Returns the applied schema version, or 0 before the first migration.
    pub async fn schema_version(&self) -> Result<i32> {
        MigrationRunner::new(self.pool.clone(), &self.table_name)
            .current_version()
            .await
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn parse_connection_url(url: &str) -> Result<tokio_postgres::Config> {
        url.parse::<tokio_postgres::Config>()
            .map_err(|e| Error::InvalidInput(format!("invalid database url: {e}")))
    }

    #[cfg(unix)]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        match h {
            tokio_postgres::config::Host::Tcp(s) => s.clone(),
            tokio_postgres::config::Host::Unix(p) => p.to_string_lossy().to_string(),
        }
    }

    #[cfg(not(unix))]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        let tokio_postgres::config::Host::Tcp(s) = h;
        s.clone()
    }

    /// Builds a deadpool config from a tokio-postgres config.
    ///
    /// Acquire, create and recycle are each bounded to 5 seconds.
    fn build_pool_config(config: &tokio_postgres::Config, pool_max_size: Option<usize>) -> Config {
        let mut cfg = Config::new();
        cfg.host = config.get_hosts().first().map(Self::host_to_string);
        cfg.port = config.get_ports().first().copied();
        cfg.user = config.get_user().map(String::from);
        cfg.password = config
            .get_password()
            .map(|p| String::from_utf8_lossy(p).to_string());
        cfg.dbname = config.get_dbname().map(String::from);

        let timeout = Some(Duration::from_secs(5));
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: pool_max_size.unwrap_or(Self::DEFAULT_POOL_MAX_SIZE),
            timeouts: deadpool_postgres::Timeouts {
                wait: timeout,
                create: timeout,
                recycle: timeout,
            },
            ..Default::default()
        });
        cfg.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        cfg
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (title, amount, note, tags) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}",
            self.table_name
        )
    }

    fn select_by_id_sql(&self) -> String {
        format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table_name)
    }

    fn update_sql(&self) -> String {
        format!(
            "UPDATE {} SET title = $1, amount = $2, note = $3, tags = $4 WHERE id = $5 RETURNING {COLUMNS}",
            self.table_name
        )
    }

    fn select_all_sql(&self) -> String {
        format!("SELECT {COLUMNS} FROM {}", self.table_name)
    }

    /// Converts a database row to an expense.
    ///
    /// `NULL` text columns read as empty strings and a `NULL` tag array as an
    /// empty list.
    fn row_to_expense(row: &Row) -> std::result::Result<ExpenseResponse, tokio_postgres::Error> {
        let tags: Option<Vec<String>> = row.try_get("tags")?;
        Ok(ExpenseResponse {
            id: row.try_get("id")?,
            title: row.try_get::<_, Option<String>>("title")?.unwrap_or_default(),
            amount: row.try_get::<_, Option<f64>>("amount")?.unwrap_or_default(),
            note: row.try_get::<_, Option<String>>("note")?.unwrap_or_default(),
            tags: tags.unwrap_or_default(),
        })
    }

    fn scan(op: &str, row: &Row) -> Result<ExpenseResponse> {
        Self::row_to_expense(row).map_err(|e| query_error(op, e))
    }
}

#[async_trait]
impl ExpenseStorage for PostgresExpenseStorage {
    async fn insert(&self, req: &ExpenseRequest) -> Result<ExpenseResponse> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client
            .query_one(
                &self.insert_sql(),
                &[&req.title, &req.amount, &req.note, &req.tags],
            )
            .await
            .map_err(|e| query_error("postgres_expenses_insert", e))?;

        Self::scan("postgres_expenses_insert", &row)
    }

    async fn search_by_id(&self, id: i64) -> Result<ExpenseResponse> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client
            .query_one(&self.select_by_id_sql(), &[&id])
            .await
            .map_err(|e| query_error("postgres_expenses_search_by_id", e))?;

        Self::scan("postgres_expenses_search_by_id", &row)
    }

    async fn update(&self, id: i64, req: &ExpenseRequest) -> Result<ExpenseResponse> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client
            .query_one(
                &self.update_sql(),
                &[&req.title, &req.amount, &req.note, &req.tags, &id],
            )
            .await
            .map_err(|e| query_error("postgres_expenses_update", e))?;

        Self::scan("postgres_expenses_update", &row)
    }

    async fn search_all(&self) -> Result<Vec<ExpenseResponse>> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let rows = client
            .query(&self.select_all_sql(), &[])
            .await
            .map_err(|e| query_error("postgres_expenses_search_all", e))?;

        rows.iter()
            .map(|row| Self::scan("postgres_expenses_search_all", row))
            .collect()
    }
}
