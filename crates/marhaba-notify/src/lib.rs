//! Marhaba Notify - HTTP relay for APNs push notifications.
//!
//! This crate accepts HTTP requests from the Marhaba app backend and relays
//! them to two hosted services: Apple's Push Notification service (APNs) for
//! alert delivery, and a Supabase table for device-token storage.
//!
//! # Architecture
//!
//! - **Config**: Validated once at startup from environment variables
//! - **Push**: One long-lived APNs client behind the [`PushSender`] trait
//! - **Store**: Supabase REST updates behind the [`TokenStore`] trait
//! - **Routes**: Notification handlers, liveness check and the middleware stack
//! - **Rate limit**: Fixed-window per-client limiter shared by all routes

pub mod config;
mod error;
pub mod extract;
pub mod push;
pub mod rate_limit;
mod routes;
mod state;
pub mod store;

pub use self::config::Config;
pub use self::error::ApiError;
pub use self::push::{ApnsPusher, PushSender, SendOutcome};
pub use self::routes::{HEALTH_MESSAGE, SendPushRequest, StoreTokenRequest, router};
pub use self::state::AppState;
pub use self::store::{SupabaseStore, TokenStore};
