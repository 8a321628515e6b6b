pub mod sources;

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use redsky_core::crisis::{DepartedVoterPolicy, ThresholdRule};
use redsky_core::federation::{FanOutSettings, LocalInstance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub crisis: CrisisConfig,
    pub federation: FederationConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub primary_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone)]
pub struct CrisisConfig {
    pub threshold_pct: u8,
    pub departed_voters: DepartedVoterPolicy,
}

impl CrisisConfig {
    /// Fails for a threshold outside `1..=100`.
    pub fn threshold_rule(&self) -> redsky_core::Result<ThresholdRule> {
        ThresholdRule::new(self.threshold_pct)
    }
}

#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
}

/// Which inbound alerts the relay accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerTrust {
    /// Any reachable, well-formed sender.
    #[default]
    Any,
    /// Only senders already present in the directory.
    Known,
}

impl PeerTrust {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerTrust::Any => "any",
            PeerTrust::Known => "known",
        }
    }
}

impl fmt::Display for PeerTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeerTrust {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(PeerTrust::Any),
            "known" => Ok(PeerTrust::Known),
            other => Err(format!("unknown peer trust mode '{other}' (expected any|known)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FederationConfig {
    pub instance: InstanceConfig,
    pub peer_timeout: Duration,
    pub fan_out_parallelism: usize,
    pub trust: PeerTrust,
}

impl FederationConfig {
    pub fn fan_out(&self) -> FanOutSettings {
        FanOutSettings {
            peer_timeout: self.peer_timeout,
            parallelism: self.fan_out_parallelism,
        }
    }

    pub fn local_instance(&self) -> LocalInstance {
        LocalInstance {
            url: self.instance.url.clone(),
            name: self.instance.name.clone(),
            description: self.instance.description.clone(),
            region: self.instance.region.clone(),
            ..LocalInstance::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
