use std::{collections::HashSet, fmt, sync::Arc};

use chrono::Utc;
use redsky_model::{
    CommunityId, CommunityMode, CrisisStatus, CrisisVote, MemberId, VoteDirection,
};
use serde::Serialize;
use tracing::info;

use crate::access;
use crate::crisis::threshold::{DepartedVoterPolicy, ThresholdRule, VoteTally};
use crate::database::ports::{
    crisis::{CommunityCrisisRecord, CrisisRepository, NewCrisisVote, TallyContext},
    membership::MembershipDirectory,
};
use crate::error::{CoreError, Result};

/// Outcome of a vote as returned to the voter.
#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub vote: CrisisVote,
    pub transitioned_to: Option<CommunityMode>,
    pub status: CrisisStatus,
}

/// Owns community mode changes, by vote or by admin override.
#[derive(Clone)]
pub struct CrisisService {
    crisis: Arc<dyn CrisisRepository>,
    membership: Arc<dyn MembershipDirectory>,
    rule: ThresholdRule,
    departed_voters: DepartedVoterPolicy,
}

impl fmt::Debug for CrisisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrisisService")
            .field("threshold_pct", &self.rule.pct())
            .field("departed_voters", &self.departed_voters)
            .finish_non_exhaustive()
    }
}

impl CrisisService {
    pub fn new(
        crisis: Arc<dyn CrisisRepository>,
        membership: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            crisis,
            membership,
            rule: ThresholdRule::default(),
            departed_voters: DepartedVoterPolicy::default(),
        }
    }

    pub fn with_rule(mut self, rule: ThresholdRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_departed_voter_policy(mut self, policy: DepartedVoterPolicy) -> Self {
        self.departed_voters = policy;
        self
    }

    pub async fn status(&self, community_id: CommunityId) -> Result<CrisisStatus> {
        let state = self.load_state(community_id).await?;
        let context = self.tally_context(community_id).await?;
        let tally = self
            .crisis
            .tally(
                community_id,
                state.transition_epoch,
                context.eligible_voters.as_ref(),
            )
            .await?;
        Ok(self.build_status(&state, tally, context.total_members))
    }

    /// Admin override. Always starts a new epoch, so pending votes in either
    /// direction stop counting even when the mode is unchanged.
    pub async fn toggle(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        mode: CommunityMode,
    ) -> Result<CrisisStatus> {
        let previous = self.load_state(community_id).await?;
        access::require_community_admin(
            self.membership.as_ref(),
            community_id,
            actor,
            "toggle crisis mode",
        )
        .await?;

        let state = self.crisis.force_mode(community_id, mode, Utc::now()).await?;
        info!(
            %community_id,
            member_id = %actor,
            from = %previous.mode,
            to = %state.mode,
            epoch = state.transition_epoch,
            "crisis mode set by admin"
        );

        let total_members = self.membership.member_count(community_id).await?;
        Ok(self.build_status(&state, VoteTally::default(), total_members))
    }

    pub async fn vote(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        direction: VoteDirection,
    ) -> Result<VoteOutcome> {
        self.load_state(community_id).await?;
        access::require_member(self.membership.as_ref(), community_id, actor).await?;

        let context = self.tally_context(community_id).await?;
        let commit = self
            .crisis
            .cast_vote(
                NewCrisisVote {
                    community_id,
                    member_id: actor,
                    direction,
                    cast_at: Utc::now(),
                },
                &context,
            )
            .await?;

        let tally = match commit.transitioned_to {
            Some(mode) => {
                info!(
                    %community_id,
                    to = %mode,
                    epoch = commit.state.transition_epoch,
                    activate = commit.tally.activate,
                    deactivate = commit.tally.deactivate,
                    total_members = context.total_members,
                    "crisis threshold reached"
                );
                VoteTally::default()
            }
            None => commit.tally,
        };

        Ok(VoteOutcome {
            status: self.build_status(&commit.state, tally, context.total_members),
            transitioned_to: commit.transitioned_to,
            vote: commit.vote,
        })
    }

    async fn load_state(&self, community_id: CommunityId) -> Result<CommunityCrisisRecord> {
        self.crisis
            .crisis_state(community_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("community {community_id}")))
    }

    async fn tally_context(&self, community_id: CommunityId) -> Result<TallyContext> {
        let total_members = self.membership.member_count(community_id).await?;
        let eligible_voters = match self.departed_voters {
            DepartedVoterPolicy::Retain => None,
            DepartedVoterPolicy::Exclude => Some(
                self.membership
                    .member_ids(community_id)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
            ),
        };
        Ok(TallyContext {
            rule: self.rule,
            total_members,
            eligible_voters,
        })
    }

    fn build_status(
        &self,
        state: &CommunityCrisisRecord,
        tally: VoteTally,
        total_members: u32,
    ) -> CrisisStatus {
        CrisisStatus {
            community_id: state.community_id,
            mode: state.mode,
            votes_to_activate: tally.activate,
            votes_to_deactivate: tally.deactivate,
            total_members,
            threshold_pct: self.rule.pct(),
            transition_epoch: state.transition_epoch,
        }
    }
}
