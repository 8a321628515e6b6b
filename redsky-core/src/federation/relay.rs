use std::{fmt, sync::Arc};

use chrono::Utc;
use futures::{StreamExt, stream};
use redsky_model::{AlertId, AlertOrigin, AlertSeverity, MemberId, RedSkyAlert};
use serde::Serialize;
use tracing::{info, warn};

use crate::access;
use crate::api::types::SendAlertRequest;
use crate::database::ports::{
    alerts::{AlertRepository, NewAlert},
    instances::InstanceRepository,
    membership::MembershipDirectory,
};
use crate::error::{CoreError, Result};
use crate::federation::{
    FanOutSettings, PeerOutcome, normalize_instance_url,
    instance::LocalInstance,
    peer::{AlertPayload, PeerClient, with_deadline},
    verifier::{PeerVerifier, TrustAllPeers},
};
use crate::tickets::lifecycle::{MAX_DESCRIPTION_CHARS, validate_title};

/// Result of a broadcast: the stored alert plus best-effort delivery counts.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastReport {
    pub alert: RedSkyAlert,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub outcomes: Vec<PeerOutcome>,
}

#[derive(Clone)]
pub struct AlertRelay {
    alerts: Arc<dyn AlertRepository>,
    instances: Arc<dyn InstanceRepository>,
    membership: Arc<dyn MembershipDirectory>,
    peers: Arc<dyn PeerClient>,
    verifier: Arc<dyn PeerVerifier>,
    local: LocalInstance,
    settings: FanOutSettings,
}

impl fmt::Debug for AlertRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertRelay")
            .field("local", &self.local.url)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn validate_body(body: Option<String>) -> Result<Option<String>> {
    match body {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_CHARS => Err(CoreError::validation(
            format!("Alert body must be at most {MAX_DESCRIPTION_CHARS} characters"),
        )),
        Some(text) if text.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

impl AlertRelay {
    pub fn new(
        alerts: Arc<dyn AlertRepository>,
        instances: Arc<dyn InstanceRepository>,
        membership: Arc<dyn MembershipDirectory>,
        peers: Arc<dyn PeerClient>,
        local: LocalInstance,
    ) -> Self {
        Self {
            alerts,
            instances,
            membership,
            peers,
            verifier: Arc::new(TrustAllPeers),
            local,
            settings: FanOutSettings::default(),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn PeerVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_settings(mut self, settings: FanOutSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<RedSkyAlert>> {
        self.alerts.list(active_only, Utc::now()).await
    }

    /// Store an alert locally, then push it to every known peer. Peer
    /// failures are reported in the result and never fail the call.
    pub async fn send(&self, actor: MemberId, request: SendAlertRequest) -> Result<BroadcastReport> {
        access::require_platform_admin(self.membership.as_ref(), actor, "send Red Sky alerts")
            .await?;

        let now = Utc::now();
        let title = validate_title(&request.title)?;
        let body = validate_body(request.body)?;
        if request.expires_at.is_some_and(|expires| expires <= now) {
            return Err(CoreError::validation("expires_at must be in the future"));
        }

        let alert = self
            .alerts
            .insert(NewAlert {
                source_instance_url: self.local.url.clone(),
                source_instance_name: Some(self.local.name.clone()),
                title,
                body,
                severity: request.severity,
                origin: AlertOrigin::Local,
                expires_at: request.expires_at,
                created_at: now,
            })
            .await?;

        let payload = AlertPayload {
            source_instance_url: alert.source_instance_url.clone(),
            source_instance_name: alert.source_instance_name.clone(),
            title: alert.title.clone(),
            body: alert.body.clone(),
            severity: alert.severity.as_str().to_string(),
            expires_at: alert.expires_at,
        };

        let targets: Vec<_> = self
            .instances
            .list(false)
            .await?
            .into_iter()
            .filter(|instance| instance.instance_url != self.local.url)
            .collect();
        let total = targets.len();
        let timeout = self.settings.peer_timeout;
        let payload = &payload;
        let alert_id = alert.id;
        let outcomes: Vec<PeerOutcome> = stream::iter(targets)
            .map(|instance| {
                let peers = Arc::clone(&self.peers);
                async move {
                    let result =
                        with_deadline(timeout, peers.push_alert(&instance.instance_url, payload))
                            .await;
                    if let Err(err) = &result {
                        warn!(
                            instance_url = %instance.instance_url,
                            %alert_id,
                            error = %err,
                            "alert delivery failed"
                        );
                    }
                    PeerOutcome::from_result(&instance.instance_url, &result)
                }
            })
            .buffer_unordered(self.settings.parallelism.max(1))
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|outcome| outcome.ok).count();
        info!(
            alert_id = %alert.id,
            severity = %alert.severity,
            succeeded,
            failed = total - succeeded,
            total,
            "red sky alert broadcast"
        );

        Ok(BroadcastReport {
            alert,
            succeeded,
            failed: total - succeeded,
            total,
            outcomes,
        })
    }

    /// Accept an alert pushed by a peer.
    pub async fn receive(&self, payload: AlertPayload) -> Result<RedSkyAlert> {
        let source_instance_url = normalize_instance_url(&payload.source_instance_url)?;
        let title = validate_title(&payload.title)?;
        let body = validate_body(payload.body)?;
        let severity: AlertSeverity = payload.severity.trim().parse()?;
        let source_instance_name = payload
            .source_instance_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let normalized = AlertPayload {
            source_instance_url,
            source_instance_name,
            title,
            body,
            severity: severity.as_str().to_string(),
            expires_at: payload.expires_at,
        };
        self.verifier.verify_alert(&normalized).await?;

        let alert = self
            .alerts
            .insert(NewAlert {
                source_instance_url: normalized.source_instance_url,
                source_instance_name: normalized.source_instance_name,
                title: normalized.title,
                body: normalized.body,
                severity,
                origin: AlertOrigin::Remote,
                expires_at: normalized.expires_at,
                created_at: Utc::now(),
            })
            .await?;
        info!(
            alert_id = %alert.id,
            source = %alert.source_instance_url,
            severity = %alert.severity,
            "red sky alert received"
        );
        Ok(alert)
    }

    /// Hide an alert locally. Peers keep their copy.
    pub async fn dismiss(&self, actor: MemberId, id: AlertId) -> Result<RedSkyAlert> {
        access::require_platform_admin(self.membership.as_ref(), actor, "dismiss alerts").await?;
        self.alerts
            .dismiss(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("alert {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::memory::MemoryBackend;
    use crate::federation::verifier::KnownPeersOnly;
    use crate::testing::ScriptedPeerClient;
    use chrono::Duration as ChronoDuration;
    use redsky_model::{InstanceInfo, PlatformRole};
    use std::time::Duration;

    struct Fixture {
        backend: MemoryBackend,
        peers: Arc<ScriptedPeerClient>,
        relay: AlertRelay,
        admin: MemberId,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        let admin = MemberId::new();
        backend.membership.set_platform_role(admin, PlatformRole::Admin);
        let relay = AlertRelay::new(
            backend.alerts.clone(),
            backend.instances.clone(),
            backend.membership.clone(),
            Arc::clone(&peers) as Arc<dyn PeerClient>,
            LocalInstance {
                url: "https://home.example".into(),
                name: "Home".into(),
                ..LocalInstance::default()
            },
        )
        .with_settings(FanOutSettings {
            peer_timeout: Duration::from_millis(100),
            parallelism: 8,
        });
        Fixture {
            backend,
            peers,
            relay,
            admin,
        }
    }

    fn send_request() -> SendAlertRequest {
        SendAlertRequest {
            title: "River flooding".into(),
            body: Some("Evacuate lower districts".into()),
            severity: AlertSeverity::Critical,
            expires_at: None,
        }
    }

    fn payload(severity: &str) -> AlertPayload {
        AlertPayload {
            source_instance_url: "https://peer.example/".into(),
            source_instance_name: Some("Peer".into()),
            title: "Heatwave".into(),
            body: None,
            severity: severity.into(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn send_skips_the_local_instance() {
        let fx = fixture();
        for url in ["https://home.example", "https://peer.example"] {
            let info = InstanceInfo {
                name: url.into(),
                ..InstanceInfo::default()
            };
            fx.peers.online(url, info.clone());
            fx.backend
                .instances
                .upsert_seen(url, &info, Utc::now())
                .await
                .unwrap();
        }

        let report = fx.relay.send(fx.admin, send_request()).await.unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(fx.peers.pushed_to(), vec!["https://peer.example".to_string()]);
    }

    #[tokio::test]
    async fn send_reports_partial_delivery_without_failing() {
        let fx = fixture();
        let urls: Vec<String> = (0..5).map(|i| format!("https://peer{i}.example")).collect();
        for url in &urls {
            fx.peers.online(url, InstanceInfo {
                name: url.clone(),
                ..InstanceInfo::default()
            });
            fx.backend
                .instances
                .upsert_seen(url, &InstanceInfo {
                    name: url.clone(),
                    ..InstanceInfo::default()
                }, Utc::now())
                .await
                .unwrap();
        }
        fx.peers.hang(&urls[1]);
        fx.peers.hang(&urls[3]);

        let report = fx.relay.send(fx.admin, send_request()).await.unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.alert.origin, AlertOrigin::Local);
        assert_eq!(report.alert.source_instance_url, "https://home.example");

        let delivered = fx.peers.pushed_to();
        assert_eq!(delivered.len(), 3);
        assert!(!delivered.contains(&urls[1]));

        let stored = fx.relay.list(true).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn send_is_admin_only_and_validated() {
        let fx = fixture();
        let err = fx
            .relay
            .send(MemberId::new(), send_request())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let mut expired = send_request();
        expired.expires_at = Some(Utc::now() - ChronoDuration::minutes(1));
        let err = fx.relay.send(fx.admin, expired).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(fx.relay.list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn receive_validates_and_tags_source() {
        let fx = fixture();
        let err = fx.relay.receive(payload("apocalyptic")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let mut untitled = payload("info");
        untitled.title = " ".into();
        assert!(fx.relay.receive(untitled).await.is_err());

        let alert = fx.relay.receive(payload("warning")).await.unwrap();
        assert_eq!(alert.origin, AlertOrigin::Remote);
        assert_eq!(alert.source_instance_url, "https://peer.example");
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(fx.relay.list(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dismissed_alerts_leave_default_listing_only() {
        let fx = fixture();
        let alert = fx.relay.receive(payload("critical")).await.unwrap();

        let err = fx.relay.dismiss(MemberId::new(), alert.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let dismissed = fx.relay.dismiss(fx.admin, alert.id).await.unwrap();
        assert!(dismissed.dismissed);
        assert!(fx.relay.list(true).await.unwrap().is_empty());
        let history = fx.relay.list(false).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].dismissed);
    }

    #[tokio::test]
    async fn known_peers_verifier_rejects_strangers() {
        let fx = fixture();
        let relay = fx
            .relay
            .clone()
            .with_verifier(Arc::new(KnownPeersOnly::new(fx.backend.instances.clone())));

        let err = relay.receive(payload("info")).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        fx.backend
            .instances
            .upsert_seen("https://peer.example", &InstanceInfo {
                name: "Peer".into(),
                ..InstanceInfo::default()
            }, Utc::now())
            .await
            .unwrap();
        relay.receive(payload("info")).await.unwrap();
    }
}
