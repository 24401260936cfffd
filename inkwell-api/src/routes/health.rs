/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "cache": "disabled"
/// }
/// ```
///
/// The cache is optional, so a Redis outage only shows up in the `cache`
/// field. A database outage turns the status to `degraded` with a 503.

use axum::{extract::State, http::StatusCode, Json};
use inkwell_shared::db::pool::health_check as database_health_check;
use serde::{Deserialize, Serialize};

use crate::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = database_health_check(&state.db).await.is_ok();

    let cache = match state.cache.client() {
        None => "disabled",
        Some(client) => match client.ping().await {
            Ok(true) => "connected",
            _ => "disconnected",
        },
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database_ok { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "connected" } else { "disconnected" }.to_string(),
            cache: cache.to_string(),
        }),
    )
}
