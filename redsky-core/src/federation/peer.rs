use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::InstanceInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::routes::v1;
use crate::error::{CoreError, Result};

pub const INSTANCE_INFO_PATH: &str = v1::instance::INFO;
pub const ALERT_RECEIVE_PATH: &str = v1::alerts::RECEIVE;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Alert body exchanged between instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub source_instance_url: String,
    #[serde(default)]
    pub source_instance_name: Option<String>,
    pub title: String,
    #[serde(default, alias = "description")]
    pub body: Option<String>,
    pub severity: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outbound calls to peer instances.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn fetch_instance_info(&self, base_url: &str) -> std::result::Result<InstanceInfo, PeerError>;

    async fn push_alert(
        &self,
        base_url: &str,
        alert: &AlertPayload,
    ) -> std::result::Result<(), PeerError>;
}

/// Bound a peer call by `timeout` regardless of the client implementation.
pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> std::result::Result<T, PeerError>
where
    F: Future<Output = std::result::Result<T, PeerError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(PeerError::Timeout(timeout)))
}

#[derive(Debug, Clone)]
pub struct ReqwestPeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestPeerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("redsky/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            timeout,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> PeerError {
        if err.is_timeout() {
            PeerError::Timeout(self.timeout)
        } else if let Some(status) = err.status() {
            PeerError::Status(status.as_u16())
        } else if err.is_decode() {
            PeerError::Malformed(err.to_string())
        } else {
            PeerError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl PeerClient for ReqwestPeerClient {
    async fn fetch_instance_info(&self, base_url: &str) -> std::result::Result<InstanceInfo, PeerError> {
        let response = self
            .http_client
            .get(format!("{base_url}{INSTANCE_INFO_PATH}"))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        if !response.status().is_success() {
            return Err(PeerError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&body).map_err(|e| PeerError::Malformed(e.to_string()))
    }

    async fn push_alert(
        &self,
        base_url: &str,
        alert: &AlertPayload,
    ) -> std::result::Result<(), PeerError> {
        let response = self
            .http_client
            .post(format!("{base_url}{ALERT_RECEIVE_PATH}"))
            .json(alert)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(PeerError::Status(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_turns_slow_calls_into_timeouts() {
        let timeout = Duration::from_millis(20);
        let result: std::result::Result<(), PeerError> = with_deadline(timeout, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(PeerError::Timeout(timeout)));
    }

    #[tokio::test]
    async fn unreachable_peer_maps_to_peer_error() {
        let client = ReqwestPeerClient::new(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let err = client
            .fetch_instance_info("http://127.0.0.1:9")
            .await
            .unwrap_err();
        assert!(matches!(err, PeerError::Unreachable(_) | PeerError::Timeout(_)));
    }

    #[test]
    fn payload_accepts_description_alias() {
        let payload: AlertPayload = serde_json::from_value(serde_json::json!({
            "source_instance_url": "https://peer.example",
            "title": "Storm",
            "description": "Shelter at the school",
            "severity": "critical",
        }))
        .unwrap();
        assert_eq!(payload.body.as_deref(), Some("Shelter at the school"));
    }
}
