use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::crisis::CommunityMode;
use crate::error::ModelError;
use crate::ids::{AlertId, InstanceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlertSeverity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AlertSeverity::Info),
            "warning" => Ok(AlertSeverity::Warning),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(ModelError::unknown("alert severity", other)),
        }
    }
}

/// Whether an alert was raised here or received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlertOrigin {
    Local,
    Remote,
}

impl AlertOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertOrigin::Local => "local",
            AlertOrigin::Remote => "remote",
        }
    }
}

impl FromStr for AlertOrigin {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AlertOrigin::Local),
            "remote" => Ok(AlertOrigin::Remote),
            other => Err(ModelError::unknown("alert origin", other)),
        }
    }
}

/// Public metadata an instance publishes for peers to crawl.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceInfo {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub region: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub platform_mode: Option<CommunityMode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub community_count: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub user_count: u32,
}

/// A peer instance recorded in the federation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnownInstance {
    pub id: InstanceId,
    pub instance_url: String,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub version: Option<String>,
    pub platform_mode: Option<CommunityMode>,
    pub community_count: u32,
    pub user_count: u32,
    pub is_reachable: bool,
    /// Last successful contact. Stale when the peer stopped answering.
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RedSkyAlert {
    pub id: AlertId,
    pub source_instance_url: String,
    pub source_instance_name: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub severity: AlertSeverity,
    pub origin: AlertOrigin,
    pub expires_at: Option<DateTime<Utc>>,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
}

impl RedSkyAlert {
    /// Active alerts are neither dismissed nor past their expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.dismissed && self.expires_at.is_none_or(|expires| expires > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn alert(dismissed: bool, expires_at: Option<DateTime<Utc>>) -> RedSkyAlert {
        RedSkyAlert {
            id: AlertId::new(),
            source_instance_url: "https://peer.example".into(),
            source_instance_name: None,
            title: "Flooding".into(),
            body: None,
            severity: AlertSeverity::Critical,
            origin: AlertOrigin::Remote,
            expires_at,
            dismissed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dismissed_or_expired_alerts_are_inactive() {
        let now = Utc::now();
        assert!(alert(false, None).is_active(now));
        assert!(alert(false, Some(now + Duration::hours(1))).is_active(now));
        assert!(!alert(true, None).is_active(now));
        assert!(!alert(false, Some(now - Duration::seconds(1))).is_active(now));
    }
}
