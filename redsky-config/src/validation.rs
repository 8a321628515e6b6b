use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::models::Config;

pub const MIN_PEER_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_PEER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("crisis threshold must be between 1 and 100 percent, got {value}")]
    ThresholdOutOfRange { value: u8 },
    #[error("federation peer timeout must be between 1s and 60s, got {}", humantime::format_duration(*value))]
    PeerTimeoutOutOfRange { value: Duration },
    #[error("federation fan-out parallelism must be at least 1")]
    ZeroFanOut,
    #[error("invalid CORS origin '{origin}': {reason}")]
    InvalidCorsOrigin { origin: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let threshold = config.crisis.threshold_pct;
    if !(1..=100).contains(&threshold) {
        return Err(ConfigGuardRailError::ThresholdOutOfRange { value: threshold });
    }

    let timeout = config.federation.peer_timeout;
    if !(MIN_PEER_TIMEOUT..=MAX_PEER_TIMEOUT).contains(&timeout) {
        return Err(ConfigGuardRailError::PeerTimeoutOutOfRange { value: timeout });
    }

    if config.federation.fan_out_parallelism == 0 {
        return Err(ConfigGuardRailError::ZeroFanOut);
    }

    for origin in &config.cors.allowed_origins {
        if origin.trim() == "*" {
            continue;
        }
        Url::parse(origin).map_err(|err| ConfigGuardRailError::InvalidCorsOrigin {
            origin: origin.clone(),
            reason: err.to_string(),
        })?;
    }

    if config.cors.is_wildcard_included() {
        warnings.push_with_hint(
            "CORS allows any origin",
            "List the web client origins in CORS_ALLOWED_ORIGINS for production deployments",
        );
    }

    if config.database.primary_url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured",
            "Set DATABASE_URL or add [database] url to redsky.toml before starting the server",
        );
    }

    Ok(warnings)
}
