use std::{fmt, sync::Arc};

use chrono::Utc;
use futures::{StreamExt, stream};
use redsky_model::{InstanceId, InstanceInfo, KnownInstance, MemberId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access;
use crate::database::ports::{instances::InstanceRepository, membership::MembershipDirectory};
use crate::error::{CoreError, Result};
use crate::federation::{
    FanOutSettings, PeerOutcome, normalize_instance_url,
    peer::{PeerClient, PeerError, with_deadline},
};

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub total: usize,
    pub refreshed: usize,
    pub unreachable: usize,
    pub outcomes: Vec<PeerOutcome>,
}

/// Registry of peer instances, kept fresh by crawling their public metadata.
#[derive(Clone)]
pub struct DirectoryService {
    instances: Arc<dyn InstanceRepository>,
    membership: Arc<dyn MembershipDirectory>,
    peers: Arc<dyn PeerClient>,
    settings: FanOutSettings,
}

impl fmt::Debug for DirectoryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Reject metadata that does not describe a usable peer.
fn validate_info(info: InstanceInfo) -> std::result::Result<InstanceInfo, PeerError> {
    if info.name.trim().is_empty() {
        return Err(PeerError::Malformed("instance name is empty".into()));
    }
    Ok(InstanceInfo {
        name: info.name.trim().to_string(),
        ..info
    })
}

impl DirectoryService {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        membership: Arc<dyn MembershipDirectory>,
        peers: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            instances,
            membership,
            peers,
            settings: FanOutSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FanOutSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn list(&self, reachable_only: bool) -> Result<Vec<KnownInstance>> {
        self.instances.list(reachable_only).await
    }

    /// Contact a peer and record it. Nothing is stored when the peer cannot
    /// be reached or answers with unusable metadata.
    pub async fn register(&self, raw_url: &str) -> Result<KnownInstance> {
        let instance_url = normalize_instance_url(raw_url)?;
        let info = with_deadline(
            self.settings.peer_timeout,
            self.peers.fetch_instance_info(&instance_url),
        )
        .await
        .and_then(validate_info)
        .map_err(|source| {
            warn!(%instance_url, error = %source, "peer registration failed");
            CoreError::Peer {
                url: instance_url.clone(),
                source,
            }
        })?;

        let instance = self
            .instances
            .upsert_seen(&instance_url, &info, Utc::now())
            .await?;
        info!(
            instance_url = %instance.instance_url,
            name = %instance.name,
            "peer instance registered"
        );
        Ok(instance)
    }

    /// Re-crawl every known peer concurrently. Unreachable peers keep their
    /// stale `last_seen_at` and are flagged rather than removed.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let known = self.instances.list(false).await?;
        let total = known.len();
        let timeout = self.settings.peer_timeout;

        let results = stream::iter(known)
            .map(|instance| {
                let peers = Arc::clone(&self.peers);
                async move {
                    let result =
                        with_deadline(timeout, peers.fetch_instance_info(&instance.instance_url))
                            .await
                            .and_then(validate_info);
                    (instance, result)
                }
            })
            .buffer_unordered(self.settings.parallelism.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut outcomes = Vec::with_capacity(total);
        let mut refreshed = 0;
        let mut unreachable = 0;
        let now = Utc::now();
        for (instance, result) in results {
            outcomes.push(PeerOutcome::from_result(&instance.instance_url, &result));
            match result {
                Ok(info) => {
                    // Peers removed while the crawl was in flight stay removed.
                    if self.instances.record_seen(instance.id, &info, now).await?.is_some() {
                        refreshed += 1;
                    } else {
                        debug!(instance_url = %instance.instance_url, "peer removed during refresh");
                    }
                }
                Err(err) => {
                    warn!(instance_url = %instance.instance_url, error = %err, "peer refresh failed");
                    self.instances.mark_unreachable(instance.id).await?;
                    unreachable += 1;
                }
            }
        }

        info!(total, refreshed, unreachable, "federation directory refreshed");
        Ok(RefreshSummary {
            total,
            refreshed,
            unreachable,
            outcomes,
        })
    }

    pub async fn remove(&self, actor: MemberId, id: InstanceId) -> Result<()> {
        access::require_platform_admin(self.membership.as_ref(), actor, "remove peer instances")
            .await?;
        if self.instances.delete(id).await? {
            info!(instance_id = %id, "peer instance removed");
            Ok(())
        } else {
            Err(CoreError::not_found(format!("instance {id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::memory::MemoryBackend;
    use crate::testing::ScriptedPeerClient;
    use redsky_model::{CommunityMode, PlatformRole};
    use std::time::Duration;

    fn info(name: &str) -> InstanceInfo {
        InstanceInfo {
            name: name.into(),
            region: Some("Berlin".into()),
            platform_mode: Some(CommunityMode::Blue),
            community_count: 3,
            user_count: 42,
            ..InstanceInfo::default()
        }
    }

    fn service(backend: &MemoryBackend, peers: Arc<ScriptedPeerClient>) -> DirectoryService {
        DirectoryService::new(backend.instances.clone(), backend.membership.clone(), peers)
            .with_settings(FanOutSettings {
                peer_timeout: Duration::from_millis(100),
                parallelism: 4,
            })
    }

    #[tokio::test]
    async fn register_stores_reachable_peer_with_metadata() {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        peers.online("https://kreuzberg.example", info("Kreuzberg Hub"));
        let service = service(&backend, peers);

        let instance = service.register("https://kreuzberg.example/").await.unwrap();
        assert_eq!(instance.instance_url, "https://kreuzberg.example");
        assert_eq!(instance.name, "Kreuzberg Hub");
        assert_eq!(instance.user_count, 42);
        assert!(instance.is_reachable);

        // Registering again upserts instead of duplicating.
        service.register("https://kreuzberg.example").await.unwrap();
        assert_eq!(service.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_or_malformed_peers_are_not_stored() {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        peers.down("https://down.example");
        peers.online("https://blank.example", info("  "));
        let service = service(&backend, peers);

        let err = service.register("https://down.example").await.unwrap_err();
        assert!(matches!(err, CoreError::Peer { .. }));
        let err = service.register("https://blank.example").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Peer {
                source: PeerError::Malformed(_),
                ..
            }
        ));
        assert!(service.list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_isolates_failing_peers() {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        for url in ["https://a.example", "https://b.example", "https://c.example"] {
            peers.online(url, info(url));
        }
        let service = service(&backend, Arc::clone(&peers));
        for url in ["https://a.example", "https://b.example", "https://c.example"] {
            service.register(url).await.unwrap();
        }
        let before = service.list(false).await.unwrap();
        let stale_seen = before
            .iter()
            .find(|i| i.instance_url == "https://c.example")
            .unwrap()
            .last_seen_at;

        peers.hang("https://c.example");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let summary = service.refresh().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.refreshed, 2);
        assert_eq!(summary.unreachable, 1);

        let after = service.list(false).await.unwrap();
        for instance in &after {
            if instance.instance_url == "https://c.example" {
                assert!(!instance.is_reachable);
                assert_eq!(instance.last_seen_at, stale_seen);
            } else {
                assert!(instance.is_reachable);
                assert!(instance.last_seen_at > stale_seen);
            }
        }
        assert_eq!(service.list(true).await.unwrap().len(), 2);
        // Most recently seen first, stale peer last.
        assert_eq!(after.last().unwrap().instance_url, "https://c.example");
    }

    #[tokio::test]
    async fn refresh_keeps_peers_removed_mid_crawl_removed() {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        peers.online("https://a.example", info("A"));
        let service = DirectoryService::new(
            backend.instances.clone(),
            backend.membership.clone(),
            peers.clone(),
        )
        .with_settings(FanOutSettings {
            peer_timeout: Duration::from_secs(2),
            parallelism: 4,
        });
        let instance = service.register("https://a.example").await.unwrap();
        let admin = MemberId::new();
        backend.membership.set_platform_role(admin, PlatformRole::Admin);

        peers.slow("https://a.example", info("A v2"), Duration::from_millis(100));
        let crawl = tokio::spawn({
            let service = service.clone();
            async move { service.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.remove(admin, instance.id).await.unwrap();

        let summary = crawl.await.unwrap().unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.refreshed, 0);
        assert_eq!(summary.unreachable, 0);
        assert!(service.list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_platform_admins_remove_peers() {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        peers.online("https://a.example", info("A"));
        let service = service(&backend, peers);
        let instance = service.register("https://a.example").await.unwrap();

        let admin = MemberId::new();
        backend.membership.set_platform_role(admin, PlatformRole::Admin);
        let err = service.remove(MemberId::new(), instance.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        service.remove(admin, instance.id).await.unwrap();
        let err = service.remove(admin, instance.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
