use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{CommunityId, CommunityMode, CrisisVote, MemberId, VoteId};
use sqlx::{PgExecutor, PgPool, postgres::PgRow};
use uuid::Uuid;

use super::{column, decode_column};
use crate::crisis::threshold::{VoteTally, evaluate_transition};
use crate::database::ports::crisis::{
    CommunityCrisisRecord, CrisisRepository, NewCrisisVote, TallyContext, VoteCommit,
};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresCrisisRepository {
    pool: PgPool,
}

impl PostgresCrisisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_record(row: &PgRow) -> Result<CommunityCrisisRecord> {
        Ok(CommunityCrisisRecord {
            community_id: CommunityId(column(row, "id")?),
            mode: decode_column(row, "mode")?,
            transition_epoch: column(row, "transition_epoch")?,
            mode_changed_at: column(row, "mode_changed_at")?,
        })
    }

    async fn tally_with<'e, E>(
        executor: E,
        community_id: CommunityId,
        epoch: i64,
        eligible_voters: Option<&HashSet<MemberId>>,
    ) -> Result<VoteTally>
    where
        E: PgExecutor<'e>,
    {
        let eligible: Option<Vec<Uuid>> =
            eligible_voters.map(|ids| ids.iter().map(MemberId::to_uuid).collect());

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT member_id) FILTER (WHERE direction = 'activate') AS activate,
                COUNT(DISTINCT member_id) FILTER (WHERE direction = 'deactivate') AS deactivate
            FROM crisis_votes
            WHERE community_id = $1
              AND epoch = $2
              AND ($3::uuid[] IS NULL OR member_id = ANY($3))
            "#,
        )
        .bind(community_id.to_uuid())
        .bind(epoch)
        .bind(eligible)
        .fetch_one(executor)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to tally crisis votes: {e}")))?;

        let activate: i64 = column(&row, "activate")?;
        let deactivate: i64 = column(&row, "deactivate")?;
        Ok(VoteTally {
            activate: activate as u32,
            deactivate: deactivate as u32,
        })
    }
}

#[async_trait]
impl CrisisRepository for PostgresCrisisRepository {
    async fn crisis_state(
        &self,
        community_id: CommunityId,
    ) -> Result<Option<CommunityCrisisRecord>> {
        let row = sqlx::query(
            "SELECT id, mode, transition_epoch, mode_changed_at FROM communities WHERE id = $1",
        )
        .bind(community_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to load community mode: {e}")))?;

        row.as_ref().map(Self::map_record).transpose()
    }

    async fn tally(
        &self,
        community_id: CommunityId,
        epoch: i64,
        eligible_voters: Option<&HashSet<MemberId>>,
    ) -> Result<VoteTally> {
        Self::tally_with(&self.pool, community_id, epoch, eligible_voters).await
    }

    async fn cast_vote(&self, vote: NewCrisisVote, context: &TallyContext) -> Result<VoteCommit> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to begin transaction: {e}")))?;

        // The row lock serialises voters of one community.
        let row = sqlx::query(
            r#"
            SELECT id, mode, transition_epoch, mode_changed_at
            FROM communities
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(vote.community_id.to_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to lock community: {e}")))?
        .ok_or_else(|| CoreError::not_found(format!("community {}", vote.community_id)))?;
        let mut state = Self::map_record(&row)?;
        let epoch = state.transition_epoch;

        let recorded = CrisisVote {
            id: VoteId::new(),
            community_id: vote.community_id,
            member_id: vote.member_id,
            direction: vote.direction,
            epoch,
            cast_at: vote.cast_at,
        };
        let inserted = sqlx::query(
            r#"
            INSERT INTO crisis_votes (id, community_id, member_id, direction, epoch, cast_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (community_id, epoch, member_id, direction) DO NOTHING
            "#,
        )
        .bind(recorded.id.to_uuid())
        .bind(recorded.community_id.to_uuid())
        .bind(recorded.member_id.to_uuid())
        .bind(recorded.direction.as_str())
        .bind(epoch)
        .bind(recorded.cast_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to record crisis vote: {e}")))?;
        if inserted.rows_affected() == 0 {
            return Err(CoreError::Conflict(format!(
                "You have already voted to {} in this round",
                vote.direction
            )));
        }

        let tally = Self::tally_with(
            &mut *tx,
            vote.community_id,
            epoch,
            context.eligible_voters.as_ref(),
        )
        .await?;
        let transitioned_to =
            evaluate_transition(state.mode, tally, context.total_members, context.rule);

        if let Some(mode) = transitioned_to {
            let row = sqlx::query(
                r#"
                UPDATE communities
                SET mode = $2, transition_epoch = transition_epoch + 1, mode_changed_at = $3
                WHERE id = $1
                RETURNING id, mode, transition_epoch, mode_changed_at
                "#,
            )
            .bind(vote.community_id.to_uuid())
            .bind(mode.as_str())
            .bind(vote.cast_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to switch community mode: {e}")))?;
            state = Self::map_record(&row)?;
        }

        tx.commit()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to commit crisis vote: {e}")))?;

        Ok(VoteCommit {
            vote: recorded,
            tally,
            transitioned_to,
            state,
        })
    }

    async fn force_mode(
        &self,
        community_id: CommunityId,
        mode: CommunityMode,
        now: DateTime<Utc>,
    ) -> Result<CommunityCrisisRecord> {
        let row = sqlx::query(
            r#"
            UPDATE communities
            SET mode = $2, transition_epoch = transition_epoch + 1, mode_changed_at = $3
            WHERE id = $1
            RETURNING id, mode, transition_epoch, mode_changed_at
            "#,
        )
        .bind(community_id.to_uuid())
        .bind(mode.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to set community mode: {e}")))?
        .ok_or_else(|| CoreError::not_found(format!("community {community_id}")))?;

        Self::map_record(&row)
    }

    async fn count_communities(&self, mode: Option<CommunityMode>) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM communities WHERE ($1::text IS NULL OR mode = $1)",
        )
        .bind(mode.map(|m| m.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to count communities: {e}")))?;
        Ok(count as u32)
    }
}
