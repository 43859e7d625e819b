use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ravenpost_core::DomainError;
use ravenpost_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Backend { operation, message } => {
            tracing::error!(operation, %message, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal storage failure",
            )
        }
    }
}

/// NotFound carries no body.
pub fn domain_error_to_response(err: DomainError) -> Response {
    match &err {
        DomainError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.message())
        }
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", err.message()),
        DomainError::NotFound => StatusCode::NOT_FOUND.into_response(),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.message()),
        DomainError::InvariantViolation(_) => {
            tracing::error!(error = %err, "invariant violated");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invariant_violation",
                err.message(),
            )
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
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
