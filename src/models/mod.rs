//! Data models for outlay.
//!
//! The request shape is what clients send; the response shape is the full
//! projection storage hands back, including the assigned identifier.

mod expense;

pub use expense::{ExpenseRequest, ExpenseResponse};
