//! Stockflow
//!
//! Low-stock alerting for multi-warehouse inventory: resolves reorder thresholds,
//! measures recent sales velocity, forecasts days until stockout and names a reorder
//! supplier for every product that is running short.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod alerts;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod repositories;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use repositories::SeaOrmAlertFacts;
use services::{AlertSettings, LowStockAlertService, ProductService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub alert_service: LowStockAlertService,
    pub product_service: ProductService,
}

impl AppState {
    /// Wires every service against one connection pool.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let facts = Arc::new(SeaOrmAlertFacts::new(db.clone()));
        let alert_service = LowStockAlertService::new(facts, AlertSettings::from(&config));
        let product_service = ProductService::new(db.clone());
        Self {
            db,
            config,
            alert_service,
            product_service,
        }
    }
}

/// Builds the full application router with tracing, timeout and CORS middleware.
pub fn build_router(state: AppState) -> Router {
    // Cross-origin requests are only opened up outside production
    let cors = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    };
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    handlers::routes()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .with_state(state)
}
