//! Expense request handlers.
//!
//! Each handler decodes its inputs, calls the service once, and maps the
//! outcome onto a status code. Decoding failures answer 400 without reaching
//! the service. Failure responses carry an empty body, including the ones
//! for path segments axum itself cannot extract.

use crate::models::ExpenseRequest;
use crate::services::ExpenseOperations;
use crate::{Error, Result};
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the expense routes.
#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn ExpenseOperations>,
}

impl AppState {
    /// Creates handler state over `service`.
    #[must_use]
    pub fn new(service: Arc<dyn ExpenseOperations>) -> Self {
        Self { service }
    }
}

/// `POST /expenses`
pub async fn add_expenses(State(state): State<AppState>, body: Bytes) -> Response {
    const OPERATION: &str = "add_expenses";

    let req = match decode_body(&body) {
        Ok(req) => req,
        Err(e) => return bad_request(OPERATION, &e),
    };

    match state.service.add_expenses(req).await {
        Ok(expense) => success(OPERATION, StatusCode::CREATED, &expense),
        Err(e) => error_response(OPERATION, &e),
    }
}

/// `GET /expenses/{id}`
pub async fn search_expenses_by_id(
    State(state): State<AppState>,
    raw_id: std::result::Result<Path<String>, PathRejection>,
) -> Response {
    const OPERATION: &str = "search_expenses_by_id";

    let id = match path_id(raw_id) {
        Ok(id) => id,
        Err(e) => return bad_request(OPERATION, &e),
    };

    match state.service.search_expenses_by_id(id).await {
        Ok(expense) => success(OPERATION, StatusCode::OK, &expense),
        Err(e) => error_response(OPERATION, &e),
    }
}

/// `PUT /expenses/{id}`
pub async fn update_expenses(
    State(state): State<AppState>,
    raw_id: std::result::Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Response {
    const OPERATION: &str = "update_expenses";

    let decoded = path_id(raw_id).and_then(|id| decode_body(&body).map(|req| (id, req)));
    let (id, req) = match decoded {
        Ok(pair) => pair,
        Err(e) => return bad_request(OPERATION, &e),
    };

    match state.service.update_expenses(id, req).await {
        Ok(expense) => success(OPERATION, StatusCode::OK, &expense),
        Err(e) => error_response(OPERATION, &e),
    }
}

/// `GET /expenses`
pub async fn search_expenses_all(State(state): State<AppState>) -> Response {
    const OPERATION: &str = "search_expenses_all";

    match state.service.search_expenses_all().await {
        Ok(expenses) => success(OPERATION, StatusCode::OK, &expenses),
        Err(e) => error_response(OPERATION, &e),
    }
}

/// `GET /expenses/` and `PUT /expenses/`: the id segment is empty.
pub async fn missing_id() -> Response {
    bad_request(
        "missing_id",
        &Error::InvalidInput("missing expense id".to_string()),
    )
}

/// Parses a path segment as a 64-bit expense id.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the segment is empty or not an integer.
pub fn parse_id(raw: &str) -> Result<i64> {
    if raw.is_empty() {
        return Err(Error::InvalidInput("missing expense id".to_string()));
    }
    raw.parse::<i64>()
        .map_err(|e| Error::InvalidInput(format!("invalid expense id '{raw}': {e}")))
}

fn path_id(extracted: std::result::Result<Path<String>, PathRejection>) -> Result<i64> {
    let Path(raw) = extracted
        .map_err(|e| Error::InvalidInput(format!("invalid expense id: {}", e.body_text())))?;
    parse_id(&raw)
}

/// Decodes a request body as an expense, whatever its declared content type.
///
/// A zero-length body is the all-zero expense. Anything else must be a JSON
/// object; arrays are not read as positional fields.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the body is not a JSON expense object.
pub fn decode_body(body: &[u8]) -> Result<ExpenseRequest> {
    if body.is_empty() {
        return Ok(ExpenseRequest::default());
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("invalid expense body: {e}")))?;
    if !value.is_object() {
        return Err(Error::InvalidInput(
            "invalid expense body: expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidInput(format!("invalid expense body: {e}")))
}

/// Maps a service error to a response.
///
/// Classified errors answer with their suggested status; anything else is a
/// 500 and is logged here since nothing upstream has seen it.
pub fn error_response(operation: &'static str, err: &Error) -> Response {
    let status = if let Some(code) = err.status() {
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        tracing::error!(operation, error = %err, "Unclassified service error");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    record(operation, status);
    status.into_response()
}

fn bad_request(operation: &'static str, err: &Error) -> Response {
    tracing::debug!(operation, error = %err, "Rejected request");
    record(operation, StatusCode::BAD_REQUEST);
    StatusCode::BAD_REQUEST.into_response()
}

fn success<T: Serialize>(operation: &'static str, status: StatusCode, body: &T) -> Response {
    record(operation, status);
    (status, Json(body)).into_response()
}

fn record(operation: &'static str, status: StatusCode) {
    metrics::counter!(
        "expense_requests_total",
        "operation" => operation,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}
