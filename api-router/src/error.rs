use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::{AppError, JobError};
use serde::Serialize;
use thiserror::Error;

/// Message the generation service returns when the supplied key is no longer valid.
const EXPIRED_KEY_MARKER: &str = "Requested entity was not found";

pub const EXPIRED_KEY_HINT: &str = "Auth failed: please provide your API key again";

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Generation failed: {0}")]
    UpstreamError(String),

    #[error("Generation timed out: {0}")]
    Timeout(String),
}

pub fn indicates_expired_credentials(message: &str) -> bool {
    message.contains(EXPIRED_KEY_MARKER)
}

fn upstream(message: String) -> ApiError {
    if indicates_expired_credentials(&message) {
        ApiError::Unauthorized(EXPIRED_KEY_HINT.to_string())
    } else {
        ApiError::UpstreamError(message)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::Auth(msg) => Self::Unauthorized(msg),
            AppError::Job(JobError::Timeout { .. }) => Self::Timeout(err.to_string()),
            AppError::Job(
                ref job @ (JobError::Submission(_)
                | JobError::Poll(_)
                | JobError::MissingResult(_)
                | JobError::Download(_)),
            ) => upstream(job.to_string()),
            AppError::Service(_)
            | AppError::LLMParsing(_)
            | AppError::OpenAI(_)
            | AppError::Reqwest(_) => {
                tracing::warn!("Generation service error: {:?}", err);
                upstream(err.to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::InternalError(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::ValidationError(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::UpstreamError(message) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::Timeout(message) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}
