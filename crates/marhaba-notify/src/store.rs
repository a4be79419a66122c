//! Device-token storage in the Supabase profile table.
//!
//! Updates go through the PostgREST endpoint Supabase exposes at
//! `{project}/rest/v1/{table}`, filtered on the row `id`.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::SupabaseConfig;

/// Device-token storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request could not be sent or its response not read.
    #[error("supabase request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Supabase answered with a non-success status.
    #[error("supabase returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Persists a user's device push token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Set the token column on the profile row for `user_id`.
    ///
    /// `None` clears the column. Last write wins.
    async fn store_push_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// [`TokenStore`] writing to Supabase over its REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    endpoint: String,
    key: String,
    token_column: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("marhaba-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/rest/v1/{}", config.url, config.profiles_table),
            key: config.key.clone(),
            token_column: config.token_column.clone(),
        })
    }
}

#[async_trait]
impl TokenStore for SupabaseStore {
    async fn store_push_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut row = serde_json::Map::new();
        row.insert(
            self.token_column.clone(),
            token.map_or(serde_json::Value::Null, |t| t.into()),
        );

        let response = self
            .http
            .patch(&self.endpoint)
            .query(&[("id", format!("eq.{user_id}"))])
            .header("apikey", &self.key)
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        tracing::debug!(user_id = %user_id, "push token stored");
        Ok(())
    }
}
