use async_trait::async_trait;
use redsky_model::{CommunityId, CommunityRole, MemberId, PlatformRole};

use crate::error::Result;

/// Read-only view of the membership subsystem.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Role of `member_id` in the community, or `None` when not a member.
    async fn community_role(
        &self,
        community_id: CommunityId,
        member_id: MemberId,
    ) -> Result<Option<CommunityRole>>;

    async fn member_count(&self, community_id: CommunityId) -> Result<u32>;

    async fn member_ids(&self, community_id: CommunityId) -> Result<Vec<MemberId>>;

    /// Instance-wide role, or `None` for an unknown member.
    async fn platform_role(&self, member_id: MemberId) -> Result<Option<PlatformRole>>;

    async fn user_count(&self) -> Result<u32>;
}
