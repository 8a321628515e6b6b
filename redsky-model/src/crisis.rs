use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{CommunityId, MemberId, VoteId};

/// Operating mode of a community. Every community starts in Blue Sky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommunityMode {
    #[default]
    Blue,
    Red,
}

impl CommunityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityMode::Blue => "blue",
            CommunityMode::Red => "red",
        }
    }

    pub fn is_crisis(&self) -> bool {
        matches!(self, CommunityMode::Red)
    }
}

impl fmt::Display for CommunityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(CommunityMode::Blue),
            "red" => Ok(CommunityMode::Red),
            other => Err(ModelError::unknown("community mode", other)),
        }
    }
}

/// Direction of a crisis vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VoteDirection {
    /// Vote to enter Red Sky mode.
    Activate,
    /// Vote to return to Blue Sky mode.
    Deactivate,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Activate => "activate",
            VoteDirection::Deactivate => "deactivate",
        }
    }

    /// The mode this direction moves a community towards.
    pub fn target_mode(&self) -> CommunityMode {
        match self {
            VoteDirection::Activate => CommunityMode::Red,
            VoteDirection::Deactivate => CommunityMode::Blue,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activate" => Ok(VoteDirection::Activate),
            "deactivate" => Ok(VoteDirection::Deactivate),
            other => Err(ModelError::unknown("vote direction", other)),
        }
    }
}

/// A single ledger entry. Votes are never updated once cast.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrisisVote {
    pub id: VoteId,
    pub community_id: CommunityId,
    pub member_id: MemberId,
    #[cfg_attr(feature = "serde", serde(rename = "vote_type"))]
    pub direction: VoteDirection,
    /// Transition epoch of the community at the time the vote was cast.
    pub epoch: i64,
    pub cast_at: DateTime<Utc>,
}

/// Snapshot of a community's crisis state with raw tallies for the live epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrisisStatus {
    pub community_id: CommunityId,
    pub mode: CommunityMode,
    pub votes_to_activate: u32,
    pub votes_to_deactivate: u32,
    pub total_members: u32,
    pub threshold_pct: u8,
    pub transition_epoch: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_point_at_opposite_modes() {
        assert_eq!(VoteDirection::Activate.target_mode(), CommunityMode::Red);
        assert_eq!(VoteDirection::Deactivate.target_mode(), CommunityMode::Blue);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "purple".parse::<CommunityMode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown community mode 'purple'");
    }
}
