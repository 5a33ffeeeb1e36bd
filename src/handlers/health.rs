use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::warn;

use crate::{metrics, AppState};

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .route("/metrics", get(metrics_text))
}

/// Liveness probe; never touches the database.
async fn liveness_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe; fails with 503 while the database is unreachable.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "up" }))),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "database": "down" })),
            )
        }
    }
}

async fn metrics_text() -> impl IntoResponse {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to render metrics: {}", e),
        ),
    }
}
