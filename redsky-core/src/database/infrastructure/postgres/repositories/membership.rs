use async_trait::async_trait;
use redsky_model::{CommunityId, CommunityRole, MemberId, PlatformRole};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::ports::membership::MembershipDirectory;
use crate::error::{CoreError, Result};

/// Reads the membership tables maintained by the rest of the platform.
#[derive(Debug, Clone)]
pub struct PostgresMembershipDirectory {
    pool: PgPool,
}

impl PostgresMembershipDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipDirectory for PostgresMembershipDirectory {
    async fn community_role(
        &self,
        community_id: CommunityId,
        member_id: MemberId,
    ) -> Result<Option<CommunityRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM community_members WHERE community_id = $1 AND member_id = $2",
        )
        .bind(community_id.to_uuid())
        .bind(member_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to load membership: {e}")))?;

        role.map(|raw| {
            raw.parse()
                .map_err(|e| CoreError::Internal(format!("Invalid community role: {e}")))
        })
        .transpose()
    }

    async fn member_count(&self, community_id: CommunityId) -> Result<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM community_members WHERE community_id = $1")
                .bind(community_id.to_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to count members: {e}")))?;
        Ok(count as u32)
    }

    async fn member_ids(&self, community_id: CommunityId) -> Result<Vec<MemberId>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT member_id FROM community_members WHERE community_id = $1")
                .bind(community_id.to_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to list members: {e}")))?;
        Ok(ids.into_iter().map(MemberId).collect())
    }

    async fn platform_role(&self, member_id: MemberId) -> Result<Option<PlatformRole>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT platform_role FROM members WHERE id = $1")
                .bind(member_id.to_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to load platform role: {e}")))?;

        role.map(|raw| {
            raw.parse()
                .map_err(|e| CoreError::Internal(format!("Invalid platform role: {e}")))
        })
        .transpose()
    }

    async fn user_count(&self) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to count users: {e}")))?;
        Ok(count as u32)
    }
}
