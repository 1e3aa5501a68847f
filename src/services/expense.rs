//! Expense service.
//!
//! Wraps every storage failure in an [`Error::Classified`] with a suggested
//! status of 500, logging it once on the way out.

use crate::models::{ExpenseRequest, ExpenseResponse};
use crate::storage::ExpenseStorage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Suggested status for storage faults.
const INTERNAL_SERVER_ERROR: u16 = 500;

/// The operations the HTTP layer needs from the service layer.
#[async_trait]
pub trait ExpenseOperations: Send + Sync {
    /// Creates an expense.
    async fn add_expenses(&self, req: ExpenseRequest) -> Result<ExpenseResponse>;

    /// Fetches one expense.
    async fn search_expenses_by_id(&self, id: i64) -> Result<ExpenseResponse>;

    /// Replaces an expense.
    async fn update_expenses(&self, id: i64, req: ExpenseRequest) -> Result<ExpenseResponse>;

    /// Lists every expense.
    async fn search_expenses_all(&self) -> Result<Vec<ExpenseResponse>>;
}

/// Service for recording and querying expenses.
#[derive(Clone)]
pub struct ExpenseService {
    storage: Arc<dyn ExpenseStorage>,
}

impl ExpenseService {
    /// Creates a new expense service over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn ExpenseStorage>) -> Self {
        Self { storage }
    }

    /// Logs a storage failure and classifies it.
    fn classify(operation: &'static str, description: &'static str, err: Error) -> Error {
        tracing::error!(operation, error = %err, "{description}");
        metrics::counter!("expense_storage_failures_total", "operation" => operation)
            .increment(1);
        Error::classified(INTERNAL_SERVER_ERROR, description, err)
    }
}

#[async_trait]
impl ExpenseOperations for ExpenseService {
    #[instrument(skip(self, req), fields(operation = "add_expenses"))]
    async fn add_expenses(&self, req: ExpenseRequest) -> Result<ExpenseResponse> {
        self.storage
            .insert(&req)
            .await
            .map_err(|e| Self::classify("add_expenses", "Insert Expenses Error", e))
    }

    #[instrument(skip(self), fields(operation = "search_expenses_by_id"))]
    async fn search_expenses_by_id(&self, id: i64) -> Result<ExpenseResponse> {
        self.storage.search_by_id(id).await.map_err(|e| {
            Self::classify("search_expenses_by_id", "Search Expenses By Id Error", e)
        })
    }

    #[instrument(skip(self, req), fields(operation = "update_expenses"))]
    async fn update_expenses(&self, id: i64, req: ExpenseRequest) -> Result<ExpenseResponse> {
        self.storage
            .update(id, &req)
            .await
            .map_err(|e| Self::classify("update_expenses", "Update Expenses Error", e))
    }

    #[instrument(skip(self), fields(operation = "search_expenses_all"))]
    async fn search_expenses_all(&self) -> Result<Vec<ExpenseResponse>> {
        self.storage
            .search_all()
            .await
            .map_err(|e| Self::classify("search_expenses_all", "Search Expenses All Error", e))
    }
}
