//! In-memory expense storage.
//!
//! Non-persistent implementation of [`ExpenseStorage`] for local runs and
//! tests. Identifiers start at 1 and increase by one per insert.

use crate::models::{ExpenseRequest, ExpenseResponse};
use crate::storage::traits::ExpenseStorage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<ExpenseResponse>,
    last_id: i64,
}

/// In-memory expense storage.
///
/// Rows are kept in insertion order. The mutex is held only for the duration
/// of a single operation.
#[derive(Debug, Default)]
pub struct MemoryExpenseStorage {
    table: Mutex<Table>,
}

fn lock_error(operation: &str) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: "Lock poisoned".to_string(),
    }
}

fn not_found(operation: &str, id: i64) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("no expense with id {id}"),
    }
}

impl MemoryExpenseStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored expenses.
    ///
    /// Reads through a poisoned lock; rows are only pushed or replaced whole.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().rows.len(), |t| t.rows.len())
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExpenseStorage for MemoryExpenseStorage {
    async fn insert(&self, req: &ExpenseRequest) -> Result<ExpenseResponse> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| lock_error("memory_expenses_insert"))?;

        table.last_id += 1;
        let expense = ExpenseResponse::from_request(table.last_id, req);
        table.rows.push(expense.clone());
        Ok(expense)
    }

    async fn search_by_id(&self, id: i64) -> Result<ExpenseResponse> {
        let table = self
            .table
            .lock()
            .map_err(|_| lock_error("memory_expenses_search_by_id"))?;

        table
            .rows
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found("memory_expenses_search_by_id", id))
    }

    async fn update(&self, id: i64, req: &ExpenseRequest) -> Result<ExpenseResponse> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| lock_error("memory_expenses_update"))?;

        let slot = table
            .rows
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found("memory_expenses_update", id))?;
        *slot = ExpenseResponse::from_request(id, req);
        Ok(slot.clone())
    }

    async fn search_all(&self) -> Result<Vec<ExpenseResponse>> {
        let table = self
            .table
            .lock()
            .map_err(|_| lock_error("memory_expenses_search_all"))?;
        Ok(table.rows.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn lunch() -> ExpenseRequest {
        ExpenseRequest::new("lunch", 12.5)
            .with_tag("food")
            .with_tag("work")
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let storage = MemoryExpenseStorage::new();

        let first = storage.insert(&lunch()).await.unwrap();
        let second = storage.insert(&lunch()).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_search_by_id_returns_inserted_projection() {
        let storage = MemoryExpenseStorage::new();
        let created = storage.insert(&lunch()).await.unwrap();

        let first = storage.search_by_id(created.id).await.unwrap();
        let second = storage.search_by_id(created.id).await.unwrap();

        assert_eq!(first, ExpenseResponse::from_request(created.id, &lunch()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_id() {
        let storage = MemoryExpenseStorage::new();
        let created = storage.insert(&lunch()).await.unwrap();

        let replacement = ExpenseRequest::new("dinner", 40.0).with_note("late");
        let updated = storage.update(created.id, &replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "dinner");
        assert!(updated.tags.is_empty());
        assert_eq!(storage.search_by_id(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_missing_id_fails() {
        let storage = MemoryExpenseStorage::new();

        assert!(matches!(
            storage.search_by_id(9).await,
            Err(Error::OperationFailed { .. })
        ));
        assert!(matches!(
            storage.update(9, &lunch()).await,
            Err(Error::OperationFailed { .. })
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_len_survives_poisoned_lock() {
        let storage = std::sync::Arc::new(MemoryExpenseStorage::new());
        storage.insert(&lunch()).await.unwrap();

        let poisoner = std::sync::Arc::clone(&storage);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.table.lock().unwrap();
            panic!("poison the table lock");
        })
        .join();

        assert_eq!(storage.len(), 1);
        assert!(!storage.is_empty());
        assert!(matches!(
            storage.search_all().await,
            Err(Error::OperationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_all_empty_then_populated() {
        let storage = MemoryExpenseStorage::new();
        assert!(storage.search_all().await.unwrap().is_empty());

        storage.insert(&lunch()).await.unwrap();
        storage.insert(&ExpenseRequest::new("taxi", 9.0)).await.unwrap();

        let all = storage.search_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].title, "taxi");
    }
}
