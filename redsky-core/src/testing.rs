//! Test doubles for the outbound peer port.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use redsky_model::InstanceInfo;

use crate::federation::peer::{AlertPayload, PeerClient, PeerError};

#[derive(Debug, Clone)]
enum PeerScript {
    Online(InstanceInfo),
    Slow(InstanceInfo, Duration),
    Down,
    Hang,
}

/// Peer client whose behaviour is scripted per base URL. Unscripted URLs are
/// unreachable.
#[derive(Debug, Default)]
pub struct ScriptedPeerClient {
    peers: DashMap<String, PeerScript>,
    delivered: Mutex<Vec<(String, AlertPayload)>>,
}

impl ScriptedPeerClient {
    pub fn online(&self, base_url: &str, info: InstanceInfo) {
        self.peers
            .insert(base_url.to_string(), PeerScript::Online(info));
    }

    /// Answer with `info` after `delay`.
    pub fn slow(&self, base_url: &str, info: InstanceInfo, delay: Duration) {
        self.peers
            .insert(base_url.to_string(), PeerScript::Slow(info, delay));
    }

    pub fn down(&self, base_url: &str) {
        self.peers.insert(base_url.to_string(), PeerScript::Down);
    }

    /// Never answer; callers must rely on their own deadline.
    pub fn hang(&self, base_url: &str) {
        self.peers.insert(base_url.to_string(), PeerScript::Hang);
    }

    /// Base URLs that accepted an alert, in delivery order.
    pub fn pushed_to(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|delivered| delivered.iter().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default()
    }

    pub fn delivered_alerts(&self) -> Vec<AlertPayload> {
        self.delivered
            .lock()
            .map(|delivered| delivered.iter().map(|(_, alert)| alert.clone()).collect())
            .unwrap_or_default()
    }

    async fn resolve(&self, base_url: &str) -> Result<InstanceInfo, PeerError> {
        let script = self.peers.get(base_url).map(|entry| entry.value().clone());
        match script {
            Some(PeerScript::Online(info)) => Ok(info),
            Some(PeerScript::Slow(info, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(info)
            }
            Some(PeerScript::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PeerError::Timeout(Duration::from_secs(3600)))
            }
            Some(PeerScript::Down) | None => {
                Err(PeerError::Unreachable(format!("connection refused: {base_url}")))
            }
        }
    }
}

#[async_trait]
impl PeerClient for ScriptedPeerClient {
    async fn fetch_instance_info(&self, base_url: &str) -> Result<InstanceInfo, PeerError> {
        self.resolve(base_url).await
    }

    async fn push_alert(&self, base_url: &str, alert: &AlertPayload) -> Result<(), PeerError> {
        self.resolve(base_url).await?;
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((base_url.to_string(), alert.clone()));
        }
        Ok(())
    }
}
