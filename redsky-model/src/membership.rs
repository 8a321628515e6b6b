use std::{fmt, str::FromStr};

use crate::error::ModelError;

/// Role of a member inside one community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommunityRole {
    Member,
    Leader,
    Admin,
}

impl CommunityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityRole::Member => "member",
            CommunityRole::Leader => "leader",
            CommunityRole::Admin => "admin",
        }
    }

    /// Leaders and admins coordinate tickets on behalf of the community.
    pub fn is_coordinator(&self) -> bool {
        matches!(self, CommunityRole::Leader | CommunityRole::Admin)
    }
}

impl fmt::Display for CommunityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(CommunityRole::Member),
            "leader" => Ok(CommunityRole::Leader),
            "admin" => Ok(CommunityRole::Admin),
            other => Err(ModelError::unknown("community role", other)),
        }
    }
}

/// Instance-wide role. Platform admins operate the federation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlatformRole {
    #[default]
    Member,
    Admin,
}

impl PlatformRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::Member => "member",
            PlatformRole::Admin => "admin",
        }
    }
}

impl FromStr for PlatformRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(PlatformRole::Member),
            "admin" => Ok(PlatformRole::Admin),
            other => Err(ModelError::unknown("platform role", other)),
        }
    }
}
