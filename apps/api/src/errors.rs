use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Analysis(err) => {
                let status = match err {
                    AnalysisError::EmptyDocument | AnalysisError::Configuration(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    AnalysisError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    AnalysisError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    AnalysisError::InternalConsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Analysis invariant violated: {err}");
                    (status, err.code(), "An internal analysis error occurred".to_string())
                } else {
                    tracing::warn!(code = err.code(), "Analysis rejected: {err}");
                    (status, err.code(), err.to_string())
                }
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Timeout(_) => {
                tracing::warn!("{self}");
                (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
