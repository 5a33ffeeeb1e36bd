use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use super::common::{path_error, success_response};
use crate::{errors::ServiceError, services::low_stock_alerts::LowStockAlertQuery, AppState};

/// Raw query string; `window_days` is parsed by the service boundary so a bad value is
/// reported as a field error instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct AlertQueryParams {
    pub window_days: Option<String>,
}

pub fn alerts_router() -> Router<AppState> {
    Router::new().route(
        "/api/companies/:company_id/alerts/low-stock",
        get(low_stock_alerts),
    )
}

/// Ranked low-stock alerts for one company.
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    company_id: Result<Path<i32>, PathRejection>,
    Query(params): Query<AlertQueryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(company_id) = company_id.map_err(|e| path_error("company_id", e))?;
    let query = LowStockAlertQuery::parse(company_id, params.window_days.as_deref())?;
    let report = state.alert_service.low_stock_alerts(query).await?;
    Ok(success_response(report))
}
