//! Expense storage trait.

use crate::Result;
use crate::models::{ExpenseRequest, ExpenseResponse};
use async_trait::async_trait;

/// Durable CRUD access to expenses.
///
/// Implementations are shared across in-flight requests, so they must be
/// safe for concurrent use. A missing row is reported as an
/// [`Error::OperationFailed`](crate::Error::OperationFailed), the same kind as
/// any other storage fault.
#[async_trait]
pub trait ExpenseStorage: Send + Sync {
    /// Persists a new expense and returns it with its assigned identifier.
    async fn insert(&self, req: &ExpenseRequest) -> Result<ExpenseResponse>;

    /// Fetches exactly one expense.
    async fn search_by_id(&self, id: i64) -> Result<ExpenseResponse>;

    /// Replaces every field except the identifier and returns the new state.
    async fn update(&self, id: i64, req: &ExpenseRequest) -> Result<ExpenseResponse>;

    /// Returns every expense. Order is backend-defined.
    async fn search_all(&self) -> Result<Vec<ExpenseResponse>>;
}
