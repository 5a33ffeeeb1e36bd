use crate::errors::ServiceError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Malformed path segments become field errors on the named parameter.
pub fn path_error(field: &str, rejection: PathRejection) -> ServiceError {
    ServiceError::invalid_field(field, "invalid_path", rejection.body_text())
}

/// Unparseable or missing request bodies become field errors on `body`.
pub fn body_error(rejection: JsonRejection) -> ServiceError {
    ServiceError::invalid_field("body", "invalid_json", rejection.body_text())
}
