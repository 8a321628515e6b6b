#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use redsky_core::crisis::DepartedVoterPolicy;
use redsky_core::database::infrastructure::memory::MemoryBackend;
use redsky_core::testing::ScriptedPeerClient;
use redsky_model::{CommunityId, CommunityRole, InstanceInfo, MemberId, PlatformRole};
use redsky_server::infra::{
    app_state::AppState,
    config::{
        Config, ConfigMetadata, CorsConfig, CrisisConfig, DatabaseConfig, FederationConfig,
        InstanceConfig, PeerTrust, ServerConfig,
    },
    identity::ACTOR_HEADER,
    startup::create_app,
};

pub const LOCAL_URL: &str = "https://hub.local.test";

pub fn test_config(trust: PeerTrust) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig { primary_url: None },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:5173".into()],
        },
        crisis: CrisisConfig {
            threshold_pct: 60,
            departed_voters: DepartedVoterPolicy::Retain,
        },
        federation: FederationConfig {
            instance: InstanceConfig {
                url: LOCAL_URL.into(),
                name: "Local Hub".into(),
                description: Some("integration test instance".into()),
                region: Some("test-region".into()),
            },
            peer_timeout: Duration::from_millis(200),
            fan_out_parallelism: 4,
            trust,
        },
        metadata: ConfigMetadata::default(),
    }
}

/// Server over in-memory adapters and a scripted peer network.
pub struct TestApp {
    pub server: TestServer,
    pub backend: MemoryBackend,
    pub peers: Arc<ScriptedPeerClient>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_config(test_config(PeerTrust::Any))
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let backend = MemoryBackend::new();
        let peers = Arc::new(ScriptedPeerClient::default());
        let state = AppState::new(
            Arc::new(config),
            Arc::new(backend.unit_of_work()),
            peers.clone(),
        )?;
        let server = TestServer::new(create_app(state.clone()))
            .map_err(|err| anyhow!(err.to_string()))?;
        Ok(Self {
            server,
            backend,
            peers,
            state,
        })
    }

    /// Community with one admin plus `members` plain members.
    pub fn community(&self, members: usize) -> (CommunityId, MemberId, Vec<MemberId>) {
        let admin = MemberId::new();
        let plain: Vec<MemberId> = (0..members).map(|_| MemberId::new()).collect();
        let mut roster = vec![(admin, CommunityRole::Admin)];
        roster.extend(plain.iter().map(|id| (*id, CommunityRole::Member)));
        let community_id = self.backend.seed_community(&roster);
        (community_id, admin, plain)
    }

    pub fn platform_admin(&self) -> MemberId {
        let admin = MemberId::new();
        self.backend
            .membership
            .set_platform_role(admin, PlatformRole::Admin);
        admin
    }
}

pub fn peer_info(name: &str, url: &str) -> InstanceInfo {
    InstanceInfo {
        name: name.into(),
        description: None,
        region: None,
        url: Some(url.into()),
        version: Some("0.1.0".into()),
        platform_mode: None,
        community_count: 3,
        user_count: 40,
    }
}

pub trait AsActor {
    fn as_actor(self, member: MemberId) -> Self;
}

impl AsActor for TestRequest {
    fn as_actor(self, member: MemberId) -> Self {
        self.add_header(
            HeaderName::from_static(ACTOR_HEADER),
            HeaderValue::from_str(&member.to_string()).expect("uuid is a valid header"),
        )
    }
}
