//! Request body extraction accepting JSON or url-encoded forms.

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Deserialized request body.
///
/// Decodes `application/x-www-form-urlencoded` bodies as forms and anything
/// else as JSON. An empty body yields `T::default()`, so handlers see missing
/// fields rather than a decoding error.
#[derive(Debug, Clone, Default)]
pub struct RequestBody<T>(pub T);

impl<T, S> FromRequest<S> for RequestBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidBody {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let value = if is_form {
            serde_urlencoded::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))?
        } else {
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?
        };

        Ok(Self(value))
    }
}

fn invalid(message: String) -> ApiError {
    ApiError::InvalidBody {
        status: StatusCode::BAD_REQUEST,
        message: format!("Malformed request body: {message}"),
    }
}
