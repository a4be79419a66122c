//! API error types and response formatting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::push::PushError;
use crate::store::StoreError;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required request field was absent or empty.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The request body could not be read or decoded.
    #[error("invalid body: {message}")]
    InvalidBody { status: StatusCode, message: String },

    /// Writing the device token to the database failed.
    #[error("token store error: {0}")]
    TokenStore(#[from] StoreError),

    /// The push notification was not delivered.
    #[error("push error: {0}")]
    Push(#[from] PushError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::MissingParameter(name) => (StatusCode::BAD_REQUEST, format!("Missing {name}")),
            Self::InvalidBody { status, message } => (*status, message.clone()),
            Self::TokenStore(err) => {
                tracing::error!(error = %err, "error storing token");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error storing token".to_string(),
                )
            }
            Self::Push(err) => {
                tracing::error!(error = %err, "push route error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
