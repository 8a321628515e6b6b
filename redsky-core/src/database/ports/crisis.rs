use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{CommunityId, CommunityMode, CrisisVote, MemberId, VoteDirection};

use crate::crisis::threshold::{ThresholdRule, VoteTally};
use crate::error::Result;

/// Crisis columns of a community row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityCrisisRecord {
    pub community_id: CommunityId,
    pub mode: CommunityMode,
    pub transition_epoch: i64,
    pub mode_changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCrisisVote {
    pub community_id: CommunityId,
    pub member_id: MemberId,
    pub direction: VoteDirection,
    pub cast_at: DateTime<Utc>,
}

/// Membership snapshot used while tallying a vote.
#[derive(Debug, Clone)]
pub struct TallyContext {
    pub rule: ThresholdRule,
    pub total_members: u32,
    /// When set, only votes cast by these members count.
    pub eligible_voters: Option<HashSet<MemberId>>,
}

/// Result of appending a vote and evaluating the threshold atomically.
#[derive(Debug, Clone)]
pub struct VoteCommit {
    pub vote: CrisisVote,
    /// Tally of the epoch the vote was cast in, including the vote itself.
    pub tally: VoteTally,
    pub transitioned_to: Option<CommunityMode>,
    /// Community state after the commit.
    pub state: CommunityCrisisRecord,
}

#[async_trait]
pub trait CrisisRepository: Send + Sync {
    async fn crisis_state(
        &self,
        community_id: CommunityId,
    ) -> Result<Option<CommunityCrisisRecord>>;

    /// Count distinct voters per direction in `epoch`.
    async fn tally(
        &self,
        community_id: CommunityId,
        epoch: i64,
        eligible_voters: Option<&HashSet<MemberId>>,
    ) -> Result<VoteTally>;

    /// Append a vote and apply any resulting transition. Implementations must
    /// run the read, evaluate and write steps under exclusion scoped to the
    /// community so concurrent voters cause at most one transition.
    async fn cast_vote(
        &self,
        vote: NewCrisisVote,
        context: &TallyContext,
    ) -> Result<VoteCommit>;

    /// Force the mode and advance the epoch, clearing live tallies.
    async fn force_mode(
        &self,
        community_id: CommunityId,
        mode: CommunityMode,
        now: DateTime<Utc>,
    ) -> Result<CommunityCrisisRecord>;

    async fn count_communities(&self, mode: Option<CommunityMode>) -> Result<u32>;
}
