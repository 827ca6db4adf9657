//! REST routes.
//!
//! Handlers translate JSON requests into [`ProductRegistry`] calls and wrap
//! the results in `{ "success": true, ... }` envelopes.

pub mod products;
pub mod users;

use crate::domain::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use product_contract::ProductRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ProductRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<dyn ProductRegistry>) -> Self {
        Self { registry }
    }
}

/// All API routes, without middleware.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/products/register", post(products::register_product))
        .route("/api/products/verify", post(products::verify_product))
        .route("/api/products/transfer", post(products::transfer_ownership))
        .route("/api/products/report", post(products::report_counterfeit))
        .route("/api/products/:product_id", get(products::get_product))
        .route("/api/products/:product_id/history", get(products::get_history))
        .route("/api/users/register-seller", post(users::register_seller))
        .route("/api/users/:address/products/owned", get(users::products_owned))
        .route(
            "/api/users/:address/products/manufactured",
            get(users::products_manufactured),
        )
        .route("/api/users/:address/roles", get(users::roles))
        .route("/api/users/:address/roles/:role", get(users::has_role))
        .with_state(state)
}

/// Unwraps a JSON body, turning extractor rejections into 400s.
pub(crate) fn json_body<T: DeserializeOwned>(
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            let err = ApiError::from(rejection);
            tracing::warn!(error = %err.message, "Rejected request body");
            Err(err)
        }
    }
}

/// Collects required string fields, reporting every missing one at once.
#[derive(Default)]
pub(crate) struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent and blank values both count as missing.
    pub fn take(&mut self, name: &'static str, value: Option<String>) -> String {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    pub fn check(self) -> ApiResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            tracing::warn!(fields = ?self.missing, "Missing required fields");
            Err(ApiError::missing_fields(&self.missing))
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    blockchain: &'static str,
}

/// Liveness plus a probe of the backing node.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, blockchain) = match state.registry.ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Blockchain node unreachable");
            ("degraded", "unreachable")
        }
    };

    Json(HealthResponse {
        status,
        service: "digiseal-api",
        version: env!("CARGO_PKG_VERSION"),
        blockchain,
    })
}
