//! Storage backend selection.

use crate::config::OutlayConfig;
use crate::storage::{ExpenseStorage, MemoryExpenseStorage, PostgresExpenseStorage};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackendType {
    /// PostgreSQL (durable).
    #[default]
    Postgres,
    /// Process memory (lost on exit).
    Memory,
}

impl FromStr for StorageBackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            other => Err(Error::InvalidInput(format!(
                "unknown storage backend '{other}' (expected postgres or memory)"
            ))),
        }
    }
}

impl fmt::Display for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Creates the configured storage backend.
///
/// The PostgreSQL backend applies pending migrations before it is returned.
pub async fn create_storage(config: &OutlayConfig) -> Result<Arc<dyn ExpenseStorage>> {
    config.validate()?;

    match config.storage.backend {
        StorageBackendType::Memory => {
            tracing::warn!("Using in-memory storage; expenses are lost on exit");
            Ok(Arc::new(MemoryExpenseStorage::new()))
        },
        StorageBackendType::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                Error::InvalidInput("missing required configuration: DATABASE_URL".to_string())
            })?;
            let storage = PostgresExpenseStorage::connect(
                url,
                config.storage.table_name.clone(),
                Some(config.storage.pool_max_size),
            )
            .await?;
            tracing::info!(
                table = storage.table_name(),
                "Database store initialized"
            );
            Ok(Arc::new(storage))
        },
    }
}
