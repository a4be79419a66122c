//! APNs push dispatch.
//!
//! One [`ApnsPusher`] is built at startup from [`ApnsConfig`] and shared by all
//! request handlers. It owns a single long-lived `a2` client, which multiplexes
//! concurrent sends over its HTTP/2 connection pool.
//!
//! Signing material stays in memory for the life of the process: the `.p8` key
//! is decoded once into an [`ApnsKey`] and handed to the client as a reader.
//! Nothing is written to disk.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use a2::{
    Client, ClientConfig, DefaultNotificationBuilder, Endpoint, NotificationBuilder,
    NotificationOptions,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

use crate::config::ApnsConfig;

/// Sound name APNs resolves to the system default alert sound.
const DEFAULT_SOUND: &str = "default";

/// PEM-encoded APNs signing key, zeroized on drop.
#[derive(Clone)]
pub struct ApnsKey(Arc<Zeroizing<Vec<u8>>>);

impl ApnsKey {
    /// Wrap already-decoded PEM bytes.
    pub fn from_pem(pem: Vec<u8>) -> Self {
        Self(Arc::new(Zeroizing::new(pem)))
    }

    /// Decode a base64 blob holding the `.p8` file contents.
    ///
    /// Whitespace is ignored so that wrapped values copied from a dashboard work.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let compact: Zeroizing<String> = Zeroizing::new(
            encoded
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        );
        STANDARD.decode(compact.as_bytes()).map(Self::from_pem)
    }

    /// Read a `.p8` file once.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        std::fs::read(path).map(Self::from_pem)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ApnsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApnsKey(<redacted>)")
    }
}

/// Push dispatch failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    /// The signing key could not be loaded by the APNs client.
    #[error("invalid APNs signing key: {0}")]
    InvalidKey(String),

    /// APNs answered with a non-success status for this device.
    #[error(
        "APNs rejected notification (status {status}): {}",
        .reason.as_deref().unwrap_or("unknown reason")
    )]
    Rejected {
        status: u16,
        reason: Option<String>,
    },

    /// The request never produced an APNs response (connection, timeout, signing).
    #[error("APNs request failed: {0}")]
    Transport(String),
}

impl From<a2::Error> for PushError {
    fn from(err: a2::Error) -> Self {
        match err {
            a2::Error::ResponseError(response) => Self::Rejected {
                status: response.code,
                reason: response.error.map(|body| format!("{:?}", body.reason)),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

/// A device that did not receive the notification.
#[derive(Debug, Clone)]
pub struct FailedDelivery {
    /// Device token the send was addressed to.
    pub device: String,
    pub error: PushError,
}

/// Result of a single push send.
///
/// Callers pick the HTTP status from the variant; a failed send is never
/// reported as delivered.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// APNs accepted the notification.
    Delivered {
        device: String,
        /// `apns-id` assigned by APNs, when returned.
        apns_id: Option<String>,
    },
    /// The notification was not accepted for this device.
    Failed(FailedDelivery),
}

impl SendOutcome {
    pub fn failed(device: &str, error: PushError) -> Self {
        Self::Failed(FailedDelivery {
            device: device.to_string(),
            error,
        })
    }

    /// Devices the notification was delivered to.
    pub fn sent(&self) -> Vec<&str> {
        match self {
            Self::Delivered { device, .. } => vec![device.as_str()],
            Self::Failed(_) => Vec::new(),
        }
    }

    /// Devices the notification failed for, with the reason.
    pub fn failures(&self) -> Vec<&FailedDelivery> {
        match self {
            Self::Delivered { .. } => Vec::new(),
            Self::Failed(failure) => vec![failure],
        }
    }
}

/// Sends a single alert notification to one device.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, device_token: &str, title: &str, body: &str) -> SendOutcome;
}

/// [`PushSender`] backed by APNs token-based authentication.
pub struct ApnsPusher {
    client: Client,
    topic: String,
}

impl ApnsPusher {
    /// Build the long-lived APNs client.
    pub fn new(config: &ApnsConfig) -> Result<Self, PushError> {
        let endpoint = if config.production {
            Endpoint::Production
        } else {
            Endpoint::Sandbox
        };

        let client = Client::token(
            Cursor::new(config.key.as_bytes()),
            config.key_id.as_str(),
            config.team_id.as_str(),
            ClientConfig::new(endpoint),
        )
        .map_err(|e| PushError::InvalidKey(e.to_string()))?;

        tracing::info!(
            key_id = %config.key_id,
            production = config.production,
            topic = %config.bundle_id,
            "APNs client initialized"
        );

        Ok(Self {
            client,
            topic: config.bundle_id.clone(),
        })
    }
}

#[async_trait]
impl PushSender for ApnsPusher {
    async fn send(&self, device_token: &str, title: &str, body: &str) -> SendOutcome {
        let options = NotificationOptions {
            apns_topic: Some(self.topic.as_str()),
            ..Default::default()
        };

        let payload = DefaultNotificationBuilder::new()
            .set_title(title)
            .set_body(body)
            .set_sound(DEFAULT_SOUND)
            .build(device_token, options);

        outcome_for(device_token, self.client.send(payload).await)
    }
}

/// Fold an APNs client result into the outcome for one device.
fn outcome_for(device_token: &str, result: Result<a2::Response, a2::Error>) -> SendOutcome {
    match result {
        Ok(response) => {
            tracing::info!(
                apns_id = ?response.apns_id,
                status = response.code,
                "push delivered"
            );
            SendOutcome::Delivered {
                device: device_token.to_string(),
                apns_id: response.apns_id,
            }
        }
        Err(err) => {
            let error = PushError::from(err);
            tracing::error!(error = %error, "error sending push");
            SendOutcome::failed(device_token, error)
        }
    }
}
