//! Route definitions and the middleware stack.

mod health;
mod notifications;

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{OnResponse, TraceLayer};
use tracing::{Level, Span};

use crate::extract::MAX_BODY_BYTES;
use crate::rate_limit::enforce_rate_limit;
use crate::state::AppState;

pub use self::health::HEALTH_MESSAGE;
pub use self::notifications::{SendPushRequest, StoreTokenRequest};

/// Security headers added to every response.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Build the complete application router.
///
/// # Route Structure
///
/// - `GET /health` - Liveness check
/// - `POST /api/notifications/store-device-token` - Store a user's device token
/// - `POST /api/notifications/send` - Send a push notification
///
/// # Middleware (outermost first)
///
/// Security headers, CORS, request logging, compression, rate limiting,
/// body size limit.
pub fn router(state: AppState) -> Router {
    let notifications = Router::new()
        .route(
            "/store-device-token",
            post(notifications::store_device_token),
        )
        .route("/send", post(notifications::send_push));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/notifications", notifications)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(LogResponse),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::map_response(add_security_headers))
        .with_state(state)
}

/// Logs each completed request at a level chosen by its status.
#[derive(Debug, Clone, Copy)]
struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let level = response_level(response.status());
        let status = response.status().as_u16();
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if level == Level::ERROR {
            tracing::error!(status, latency_ms, "request failed");
        } else if level == Level::WARN && response.status().is_redirection() {
            tracing::warn!(status, latency_ms, "request redirected");
        } else if level == Level::WARN {
            tracing::warn!(status, latency_ms, "request rejected");
        } else {
            tracing::info!(status, latency_ms, "request completed");
        }
    }
}

/// 5xx logs at error, 4xx and 3xx at warn, everything else at info.
fn response_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() || status.is_redirection() {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Add security headers, leaving any the handler set itself.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for &(name, value) in SECURITY_HEADERS {
        if !headers.contains_key(name) {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
    }
    response
}
