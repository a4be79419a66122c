//! Notification endpoints: device-token registration and push sends.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::RequestBody;
use crate::push::SendOutcome;
use crate::state::AppState;

/// Body of `POST /api/notifications/store-device-token`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTokenRequest {
    pub user_id: Option<String>,
    /// Device push token; absent clears the stored value.
    pub token: Option<String>,
}

/// Body of `POST /api/notifications/send`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendPushRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Acknowledgement returned on success.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// `POST /api/notifications/store-device-token`
///
/// Sets the push token on the profile row for `userId`.
pub async fn store_device_token(
    State(state): State<AppState>,
    RequestBody(request): RequestBody<StoreTokenRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user_id = request
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingParameter("userId"))?;

    state
        .tokens
        .store_push_token(&user_id, request.token.as_deref())
        .await?;

    tracing::info!(user_id = %user_id, "device token stored");
    Ok(SuccessResponse::ok())
}

/// `POST /api/notifications/send`
///
/// Sends one alert notification. Every failure, including an unreadable body,
/// is answered with the same generic 500.
pub async fn send_push(
    State(state): State<AppState>,
    body: Result<RequestBody<SendPushRequest>, ApiError>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let RequestBody(request) = match body {
        Ok(body) => body,
        Err(err) => {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "unreadable push request: {err}"
            )));
        }
    };

    let outcome = state
        .push
        .send(&request.token, &request.title, &request.body)
        .await;

    let failed: Vec<&str> = outcome
        .failures()
        .iter()
        .map(|failure| failure.device.as_str())
        .collect();
    tracing::info!(sent = ?outcome.sent(), failed = ?failed, "APNs result");

    match outcome {
        SendOutcome::Delivered { .. } => Ok(SuccessResponse::ok()),
        SendOutcome::Failed(failure) => Err(ApiError::Push(failure.error)),
    }
}
