use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::GenerationError;
use crate::pitch::validation::ValidationError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::Validation(e) => {
                tracing::debug!("Rejected pitch request: {e}");
                (StatusCode::BAD_REQUEST, e.code(), e.to_string(), Some(e.field()))
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_BODY", msg.clone(), None)
            }
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded, retry in {retry_after_secs}s"),
                None,
            ),
            AppError::Generation(e) => {
                tracing::error!("Generation error: {e}");
                let (status, code) = match e {
                    GenerationError::UpstreamTimeout(_) => {
                        (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT")
                    }
                    GenerationError::UpstreamRejected { .. } => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED")
                    }
                    GenerationError::UpstreamUnavailable(_) => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE")
                    }
                    GenerationError::MalformedOutput(_) => {
                        (StatusCode::BAD_GATEWAY, "MALFORMED_OUTPUT")
                    }
                };
                (status, code, "AI generation failed.".to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(field) = field {
            error["field"] = json!(field);
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
        }
        response
    }
}
