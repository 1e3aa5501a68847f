//! HTTP server bootstrap.

use crate::http::handler::{
    AppState, add_expenses, missing_id, search_expenses_all, search_expenses_by_id,
    update_expenses,
};
use crate::services::ExpenseOperations;
use crate::{Error, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Builds the expense routes without any middleware.
pub fn expense_routes(service: Arc<dyn ExpenseOperations>) -> Router {
    Router::new()
        .route("/expenses", post(add_expenses).get(search_expenses_all))
        .route("/expenses/", get(missing_id).put(missing_id))
        .route(
            "/expenses/{id}",
            get(search_expenses_by_id).put(update_expenses),
        )
        .with_state(AppState::new(service))
}

/// HTTP server for the expense API.
pub struct ExpenseServer {
    service: Arc<dyn ExpenseOperations>,
    port: u16,
    auth_key: Option<Arc<str>>,
}

impl ExpenseServer {
    /// Creates a server for `service` listening on `port`.
    #[must_use]
    pub fn new(service: Arc<dyn ExpenseOperations>, port: u16) -> Self {
        Self {
            service,
            port,
            auth_key: None,
        }
    }

    /// Requires every request to carry `key` as its `Authorization` value.
    ///
    /// `None` or an empty key leaves the check disabled.
    #[must_use]
    pub fn with_auth_key(mut self, key: Option<String>) -> Self {
        self.auth_key = key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }

    /// Returns the configured port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Builds the full application router with middleware.
    pub fn router(&self) -> Router {
        let mut app = expense_routes(Arc::clone(&self.service));

        if let Some(key) = &self.auth_key {
            app = app.layer(middleware::from_fn_with_state(
                Arc::clone(key),
                require_auth_key,
            ));
        }

        app.layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
    }

    /// Binds `0.0.0.0:{port}` and serves until Ctrl-C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the server fails.
    pub async fn serve(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "bind".to_string(),
                cause: e.to_string(),
            })?;

        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `signal` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let port = listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.port);
        let app = self.router();

        tracing::info!(port, auth = self.auth_key.is_some(), "App started");

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "serve".to_string(),
                cause: e.to_string(),
            })?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn require_auth_key(State(key): State<Arc<str>>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if supplied != Some(&*key) {
        tracing::warn!(
            method = %request.method(),
            uri = %request.uri(),
            "Rejected request with missing or wrong authorization"
        );
        metrics::counter!("expense_auth_failures_total").increment(1);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(request).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Server shutting down");
}
