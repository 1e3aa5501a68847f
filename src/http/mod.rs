//! HTTP interface.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | POST | `/expenses` | 201 |
//! | GET | `/expenses/{id}` | 200 |
//! | PUT | `/expenses/{id}` | 200 |
//! | GET | `/expenses` | 200 |

pub mod handler;
mod server;

pub use handler::AppState;
pub use server::{ExpenseServer, expense_routes};
