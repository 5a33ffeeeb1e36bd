pub mod alerts;
pub mod common;
pub mod health;
pub mod products;

use axum::Router;

pub use crate::AppState;

/// Every HTTP route the service exposes, before middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::health_router())
        .merge(alerts::alerts_router())
        .merge(products::products_router())
}
