//! Peer-instance directory and cross-instance Red Sky alert relay.
//!
//! Peers are trusted on reachability alone. Inbound alerts pass through a
//! [`verifier::PeerVerifier`] so stronger trust models can be slotted in
//! without touching the relay.

pub mod directory;
pub mod instance;
pub mod peer;
pub mod relay;
pub mod verifier;

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::{CoreError, Result};

pub use directory::{DirectoryService, RefreshSummary};
pub use instance::{InstanceInfoService, LocalInstance};
pub use peer::{AlertPayload, PeerClient, PeerError, ReqwestPeerClient};
pub use relay::{AlertRelay, BroadcastReport};
pub use verifier::{KnownPeersOnly, PeerVerifier, TrustAllPeers};

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_FAN_OUT_PARALLELISM: usize = 16;

/// Limits applied to every outbound peer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutSettings {
    pub peer_timeout: Duration,
    pub parallelism: usize,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            parallelism: DEFAULT_FAN_OUT_PARALLELISM,
        }
    }
}

/// Result of one peer call within a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerOutcome {
    pub instance_url: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PeerOutcome {
    pub fn from_result<T>(instance_url: &str, result: &std::result::Result<T, PeerError>) -> Self {
        Self {
            instance_url: instance_url.to_string(),
            ok: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Canonical form of a peer base URL: absolute http(s), lower-cased host,
/// no query or fragment, no trailing slash.
pub fn normalize_instance_url(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| CoreError::validation(format!("Invalid instance URL '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::validation(format!(
            "Instance URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::validation("Instance URL must include a host"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}
