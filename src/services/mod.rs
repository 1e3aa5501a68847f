//! Business logic services.
//!
//! Services sit between the HTTP handlers and storage. They are the only
//! place that decides which status a storage failure should imply.

mod expense;

pub use expense::{ExpenseOperations, ExpenseService};
