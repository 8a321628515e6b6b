use std::sync::Arc;

use async_trait::async_trait;

use crate::database::ports::instances::InstanceRepository;
use crate::error::{CoreError, Result};
use crate::federation::peer::AlertPayload;

/// Decides whether an inbound alert's claimed source is acceptable.
#[async_trait]
pub trait PeerVerifier: Send + Sync {
    /// `alert.source_instance_url` is already normalized when this is called.
    async fn verify_alert(&self, alert: &AlertPayload) -> Result<()>;
}

/// Accepts every well-formed alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAllPeers;

#[async_trait]
impl PeerVerifier for TrustAllPeers {
    async fn verify_alert(&self, _alert: &AlertPayload) -> Result<()> {
        Ok(())
    }
}

/// Accepts alerts only from instances already in the directory.
#[derive(Clone)]
pub struct KnownPeersOnly {
    instances: Arc<dyn InstanceRepository>,
}

impl std::fmt::Debug for KnownPeersOnly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownPeersOnly").finish_non_exhaustive()
    }
}

impl KnownPeersOnly {
    pub fn new(instances: Arc<dyn InstanceRepository>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl PeerVerifier for KnownPeersOnly {
    async fn verify_alert(&self, alert: &AlertPayload) -> Result<()> {
        let known = self
            .instances
            .list(false)
            .await?
            .iter()
            .any(|instance| instance.instance_url == alert.source_instance_url);
        if known {
            Ok(())
        } else {
            Err(CoreError::forbidden(format!(
                "Alerts from {} are not accepted: instance is not in the directory",
                alert.source_instance_url
            )))
        }
    }
}
