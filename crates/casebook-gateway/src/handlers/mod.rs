//! HTTP handlers. Every handler returns `ApiResult`, so failures map to a
//! status code in one place.

pub(crate) mod ai;
pub(crate) mod dashboard;
pub(crate) mod records;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use casebook_core::CaseError;
use serde_json::json;

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Handler error. `NotFound` becomes 404; everything else is logged and
/// answered with a generic 500.
#[derive(Debug)]
pub(crate) struct ApiError(CaseError);

impl<E> From<E> for ApiError
where
    E: Into<CaseError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(err) = self;
        if matches!(err, CaseError::NotFound { .. }) {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": err.to_string() }))).into_response();
        }
        tracing::error!(error = %err, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "an error occurred" })),
        )
            .into_response()
    }
}
