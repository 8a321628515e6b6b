use std::{collections::HashSet, fmt, str::FromStr};

use redsky_model::{CommunityMode, MemberId, VoteDirection};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_THRESHOLD_PCT: u8 = 60;

/// Share of current members that must vote in one direction to flip the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRule {
    threshold_pct: u8,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_THRESHOLD_PCT,
        }
    }
}

impl ThresholdRule {
    pub fn new(threshold_pct: u8) -> Result<Self> {
        if !(1..=100).contains(&threshold_pct) {
            return Err(CoreError::validation(format!(
                "crisis threshold must be between 1 and 100, got {threshold_pct}"
            )));
        }
        Ok(Self { threshold_pct })
    }

    pub fn pct(&self) -> u8 {
        self.threshold_pct
    }

    /// `count / total >= pct / 100`, in integer arithmetic. An empty
    /// community never meets the threshold.
    pub fn is_met(&self, count: u32, total_members: u32) -> bool {
        total_members > 0
            && u64::from(count) * 100 >= u64::from(self.threshold_pct) * u64::from(total_members)
    }
}

/// Distinct voters per direction within one epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub activate: u32,
    pub deactivate: u32,
}

impl VoteTally {
    pub fn count(&self, direction: VoteDirection) -> u32 {
        match direction {
            VoteDirection::Activate => self.activate,
            VoteDirection::Deactivate => self.deactivate,
        }
    }

    /// Tally raw ledger entries, counting each member at most once per
    /// direction and skipping voters outside `eligible` when given.
    pub fn from_votes<'a, I>(votes: I, eligible: Option<&HashSet<MemberId>>) -> Self
    where
        I: IntoIterator<Item = (&'a MemberId, VoteDirection)>,
    {
        let mut activate = HashSet::new();
        let mut deactivate = HashSet::new();
        for (member, direction) in votes {
            if eligible.is_some_and(|set| !set.contains(member)) {
                continue;
            }
            match direction {
                VoteDirection::Activate => activate.insert(*member),
                VoteDirection::Deactivate => deactivate.insert(*member),
            };
        }
        Self {
            activate: activate.len() as u32,
            deactivate: deactivate.len() as u32,
        }
    }
}

/// Mode the community should move to given the live tally, if any.
pub fn evaluate_transition(
    mode: CommunityMode,
    tally: VoteTally,
    total_members: u32,
    rule: ThresholdRule,
) -> Option<CommunityMode> {
    match mode {
        CommunityMode::Blue if rule.is_met(tally.activate, total_members) => {
            Some(CommunityMode::Red)
        }
        CommunityMode::Red if rule.is_met(tally.deactivate, total_members) => {
            Some(CommunityMode::Blue)
        }
        _ => None,
    }
}

/// How votes from members who have since left the community are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartedVoterPolicy {
    /// Past votes keep counting; only the denominator shrinks.
    #[default]
    Retain,
    /// Votes from non-members are dropped from the tally.
    Exclude,
}

impl DepartedVoterPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepartedVoterPolicy::Retain => "retain",
            DepartedVoterPolicy::Exclude => "exclude",
        }
    }
}

impl fmt::Display for DepartedVoterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepartedVoterPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(DepartedVoterPolicy::Retain),
            "exclude" => Ok(DepartedVoterPolicy::Exclude),
            other => Err(CoreError::validation(format!(
                "unknown departed voter policy '{other}'"
            ))),
        }
    }
}
