//! Storage layer.
//!
//! Storage is the only place that issues data-manipulation statements. Every
//! backend implements [`ExpenseStorage`]:
//! - **PostgreSQL**: the durable backend, tags bound to a `TEXT[]` column
//! - **Memory**: process-local, used for local runs and tests

// Allow significant_drop_tightening - dropping pooled clients slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

mod factory;
pub mod memory;
pub mod migrations;
pub mod postgresql;
mod traits;

pub use factory::{StorageBackendType, create_storage};
pub use memory::MemoryExpenseStorage;
pub use postgresql::PostgresExpenseStorage;
pub use traits::ExpenseStorage;

/// Returns true if `name` can be spliced into SQL as a table identifier.
///
/// Only lowercase ASCII letters, digits and underscores are accepted, and the
/// name must not start with a digit.
#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}
