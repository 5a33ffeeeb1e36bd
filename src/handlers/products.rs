use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use super::common::{body_error, created_response, path_error};
use crate::{errors::ServiceError, services::product_service::CreateProductRequest, AppState};

pub fn products_router() -> Router<AppState> {
    Router::new().route("/api/companies/:company_id/products", post(create_product))
}

/// Creates a product, optionally with its opening inventory row.
pub async fn create_product(
    State(state): State<AppState>,
    company_id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(company_id) = company_id.map_err(|e| path_error("company_id", e))?;
    let Json(request) = payload.map_err(body_error)?;
    let created = state
        .product_service
        .create_product(company_id, request)
        .await?;
    Ok(created_response(created))
}
