//! # Outlay
//!
//! A small record-management service for expenses.
//!
//! Requests flow through three layers, each behind a narrow trait so it can
//! be swapped out in tests:
//!
//! - **Handler** ([`http`]): decodes the request, calls the service, maps the
//!   outcome to a status code and body.
//! - **Service** ([`services`]): calls storage and classifies failures into an
//!   [`Error::Classified`] carrying a suggested status.
//! - **Storage** ([`storage`]): parameterized SQL against PostgreSQL, with the
//!   tag list bound to a `TEXT[]` column.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use outlay::{ExpenseRequest, ExpenseService};
//! use outlay::storage::MemoryExpenseStorage;
//!
//! let service = ExpenseService::new(Arc::new(MemoryExpenseStorage::new()));
//! let created = service.add_expenses(ExpenseRequest {
//!     title: "lunch".to_string(),
//!     amount: 12.5,
//!     note: String::new(),
//!     tags: vec!["food".to_string()],
//! }).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod http;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::OutlayConfig;
pub use models::{ExpenseRequest, ExpenseResponse};
pub use services::{ExpenseOperations, ExpenseService};
pub use storage::{ExpenseStorage, MemoryExpenseStorage, PostgresExpenseStorage};

/// Error type for outlay operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed request body, bad path id, bad configuration value |
/// | `OperationFailed` | Database connectivity, constraint, missing row, scan failures |
/// | `Classified` | The service layer wrapped a failure with a suggested status |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A request body is not a valid expense JSON object
    /// - A path identifier is missing or not a 64-bit integer
    /// - A configuration value cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - A PostgreSQL statement fails or returns no row
    /// - The connection pool cannot hand out a client
    /// - Config files cannot be read, or the server cannot bind
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A failure the service layer has classified for the transport.
    ///
    /// The `source` is kept for diagnostics and is never sent to clients.
    #[error("{status}:{description}")]
    Classified {
        /// Suggested HTTP status code.
        status: u16,
        /// Which operation failed.
        description: String,
        /// The original error.
        #[source]
        source: Box<Self>,
    },
}

impl Error {
    /// Wraps an error with a suggested status and description.
    #[must_use]
    pub fn classified(status: u16, description: impl Into<String>, source: Self) -> Self {
        Self::Classified {
            status,
            description: description.into(),
            source: Box::new(source),
        }
    }

    /// Returns the suggested status if this error has been classified.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Classified { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for outlay operations.
pub type Result<T> = std::result::Result<T, Error>;
