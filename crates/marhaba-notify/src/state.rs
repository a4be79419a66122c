//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::push::{ApnsPusher, PushSender};
use crate::rate_limit::RateLimiter;
use crate::store::{SupabaseStore, TokenStore};

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Push dispatch adapter (one long-lived APNs client).
    pub push: Arc<dyn PushSender>,

    /// Device-token storage.
    pub tokens: Arc<dyn TokenStore>,

    /// Per-client request limiter.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create the application state, connecting to APNs and Supabase.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let push = ApnsPusher::new(&config.apns)?;
        let tokens = SupabaseStore::new(&config.supabase)?;
        Ok(Self::with_services(config, Arc::new(push), Arc::new(tokens)))
    }

    /// Create the application state around existing service implementations.
    pub fn with_services(
        config: Config,
        push: Arc<dyn PushSender>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Self {
            config: Arc::new(config),
            push,
            tokens,
            limiter,
        }
    }
}
