//! Role checks shared by the domain services.

use redsky_model::{CommunityId, CommunityRole, MemberId, PlatformRole};

use crate::database::ports::membership::MembershipDirectory;
use crate::error::{CoreError, Result};

pub async fn require_member(
    membership: &dyn MembershipDirectory,
    community_id: CommunityId,
    actor: MemberId,
) -> Result<CommunityRole> {
    membership
        .community_role(community_id, actor)
        .await?
        .ok_or_else(|| CoreError::forbidden("You must be a member of this community"))
}

pub async fn require_coordinator(
    membership: &dyn MembershipDirectory,
    community_id: CommunityId,
    actor: MemberId,
    action: &str,
) -> Result<CommunityRole> {
    let role = require_member(membership, community_id, actor).await?;
    if role.is_coordinator() {
        Ok(role)
    } else {
        Err(CoreError::forbidden(format!(
            "Only leaders and admins can {action}"
        )))
    }
}

pub async fn require_community_admin(
    membership: &dyn MembershipDirectory,
    community_id: CommunityId,
    actor: MemberId,
    action: &str,
) -> Result<()> {
    match require_member(membership, community_id, actor).await? {
        CommunityRole::Admin => Ok(()),
        _ => Err(CoreError::forbidden(format!(
            "Only community admins can {action}"
        ))),
    }
}

pub async fn require_platform_admin(
    membership: &dyn MembershipDirectory,
    actor: MemberId,
    action: &str,
) -> Result<()> {
    match membership.platform_role(actor).await? {
        Some(PlatformRole::Admin) => Ok(()),
        _ => Err(CoreError::forbidden(format!(
            "Only platform admins can {action}"
        ))),
    }
}
