//! Embedded PostgreSQL schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order when
//! the PostgreSQL backend starts. Each table tracks its own applied versions
//! in `<table>_schema_migrations`.
//!
//! ```rust,ignore
//! use outlay::storage::migrations::{EXPENSE_MIGRATIONS, MigrationRunner};
//!
//! let runner = MigrationRunner::new(pool, "expenses");
//! runner.run(EXPENSE_MIGRATIONS).await?;
//! ```

use crate::{Error, Result};
use deadpool_postgres::{Object, Pool};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply. Statements are separated by semicolons and `{table}` is
    /// replaced with the table name.
    pub sql: &'static str,
}

/// Schema history of the expenses table.
pub const EXPENSE_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial expenses table",
    sql: r"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            title TEXT,
            amount DOUBLE PRECISION,
            note TEXT,
            tags TEXT[]
        );
    ",
}];

/// Applies pending migrations to one table.
pub struct MigrationRunner {
    pool: Pool,
    table_name: String,
}

fn migration_error(operation: impl Into<String>, e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: operation.into(),
        cause: e.to_string(),
    }
}

impl MigrationRunner {
    /// Creates a new migration runner.
    #[must_use]
    pub fn new(pool: Pool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Runs all pending migrations and returns the resulting schema version.
    pub async fn run(&self, migrations: &[Migration]) -> Result<i32> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| migration_error("migration_get_connection", e))?;

        self.ensure_migrations_table(&client).await?;
        let mut version = self.get_current_version(&client).await?;

        for migration in migrations {
            if migration.version > version {
                self.apply_migration(&mut client, migration).await?;
                version = migration.version;
            }
        }

        Ok(version)
    }

    /// Returns the current schema version, or 0 if nothing has been applied.
    pub async fn current_version(&self) -> Result<i32> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| migration_error("migration_get_connection", e))?;

        let exists: bool = client
            .query_one(
                "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
                &[&self.migrations_table_name()],
            )
            .await
            .map(|row| row.get(0))
            .map_err(|e| migration_error("migration_table_exists", e))?;

        if !exists {
            return Ok(0);
        }

        self.get_current_version(&client).await
    }

    fn migrations_table_name(&self) -> String {
        format!("{}_schema_migrations", self.table_name)
    }

    async fn ensure_migrations_table(&self, client: &Object) -> Result<()> {
        let migrations_table = self.migrations_table_name();
        let sql = format!(
            r"
            CREATE TABLE IF NOT EXISTS {migrations_table} (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "
        );

        client
            .execute(&sql, &[])
            .await
            .map_err(|e| migration_error("create_migrations_table", e))?;

        Ok(())
    }

    async fn get_current_version(&self, client: &Object) -> Result<i32> {
        let migrations_table = self.migrations_table_name();
        let sql = format!("SELECT COALESCE(MAX(version), 0) FROM {migrations_table}");

        client
            .query_one(&sql, &[])
            .await
            .map(|row| row.get(0))
            .map_err(|e| migration_error("migration_current_version", e))
    }

    /// Applies one migration and records it in a single transaction.
    async fn apply_migration(&self, client: &mut Object, migration: &Migration) -> Result<()> {
        let migrations_table = self.migrations_table_name();
        let sql = migration.sql.replace("{table}", &self.table_name);

        let tx = client
            .transaction()
            .await
            .map_err(|e| migration_error(format!("migration_v{}_begin_tx", migration.version), e))?;

        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            tx.execute(statement, &[]).await.map_err(|e| {
                migration_error(
                    format!("migration_v{}: {}", migration.version, migration.description),
                    e,
                )
            })?;
        }

        let record_sql =
            format!("INSERT INTO {migrations_table} (version, description) VALUES ($1, $2)");
        tx.execute(&record_sql, &[&migration.version, &migration.description])
            .await
            .map_err(|e| migration_error("record_migration", e))?;

        tx.commit()
            .await
            .map_err(|e| migration_error(format!("migration_v{}_commit", migration.version), e))?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            table = self.table_name,
            "Applied migration"
        );

        Ok(())
    }
}

/// Maximum version across a set of migrations.
#[must_use]
pub fn max_version(migrations: &[Migration]) -> i32 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_version_of_expense_migrations() {
        assert_eq!(max_version(EXPENSE_MIGRATIONS), 1);
        assert_eq!(max_version(&[]), 0);
    }

    #[test]
    fn test_expense_schema_has_array_tags_column() {
        let sql = EXPENSE_MIGRATIONS[0].sql.replace("{table}", "expenses");
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS expenses"));
        assert!(sql.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("tags TEXT[]"));
    }

    #[test]
    fn test_migrations_are_sequential() {
        for (i, migration) in EXPENSE_MIGRATIONS.iter().enumerate() {
            assert_eq!(usize::try_from(migration.version).ok(), Some(i + 1));
        }
    }
}
