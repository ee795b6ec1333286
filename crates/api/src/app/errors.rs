use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tradeflow_core::DomainError;
use tradeflow_infra::{DispatchError, StoreError};

/// Error returned by handlers; rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Dispatch(DispatchError),
    Store(StoreError),
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Domain(e) => ApiError::Domain(e),
            other => ApiError::Dispatch(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(e) => ApiError::Domain(e),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg),
            ApiError::Dispatch(DispatchError::Concurrency(msg)) => {
                json_error(StatusCode::CONFLICT, "conflict", msg)
            }
            ApiError::Dispatch(err) => {
                tracing::error!(error = %err, "dispatch failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
            }
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg)
        }
        DomainError::InvalidState(msg) => json_error(StatusCode::CONFLICT, "invalid_state", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
