use serde::{Deserialize, Serialize};

use crate::util::{RawVar, parse_csv_var, raw_var, string_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    #[serde(default)]
    pub crisis: FileCrisisConfig,
    #[serde(default)]
    pub federation: FileFederationConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCrisisConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departed_voter_policy: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileFederationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_region: Option<String>,
    /// Humantime duration such as `8s` or `1m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_out_parallelism: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust: Option<String>,
}

/// Environment-derived configuration values.
///
/// Typed settings are kept as [`RawVar`] so parse failures can name the
/// offending variable.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<RawVar>,
    pub database_url: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub crisis_threshold_pct: Option<RawVar>,
    pub crisis_departed_voter_policy: Option<RawVar>,
    pub instance_url: Option<String>,
    pub instance_name: Option<String>,
    pub instance_description: Option<String>,
    pub instance_region: Option<String>,
    pub federation_peer_timeout: Option<RawVar>,
    pub federation_fan_out: Option<RawVar>,
    pub federation_trust: Option<RawVar>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: string_var("REDSKY_CONFIG_PATH"),
            server_host: string_var("SERVER_HOST"),
            server_port: raw_var("SERVER_PORT"),
            database_url: string_var("DATABASE_URL"),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            crisis_threshold_pct: raw_var("CRISIS_THRESHOLD_PCT"),
            crisis_departed_voter_policy: raw_var("CRISIS_DEPARTED_VOTER_POLICY"),
            instance_url: string_var("INSTANCE_URL"),
            instance_name: string_var("INSTANCE_NAME"),
            instance_description: string_var("INSTANCE_DESCRIPTION"),
            instance_region: string_var("INSTANCE_REGION"),
            federation_peer_timeout: raw_var("FEDERATION_PEER_TIMEOUT"),
            federation_fan_out: raw_var("FEDERATION_FAN_OUT"),
            federation_trust: raw_var("FEDERATION_TRUST"),
        }
    }
}
