use std::{fmt, sync::Arc};

use redsky_model::{CommunityMode, InstanceInfo};

use crate::database::ports::{crisis::CrisisRepository, membership::MembershipDirectory};
use crate::error::Result;

/// How this instance identifies itself to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstance {
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub version: String,
}

impl Default for LocalInstance {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".into(),
            name: "Red Sky".into(),
            description: None,
            region: None,
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Builds the public metadata document peers crawl.
#[derive(Clone)]
pub struct InstanceInfoService {
    local: LocalInstance,
    crisis: Arc<dyn CrisisRepository>,
    membership: Arc<dyn MembershipDirectory>,
}

impl fmt::Debug for InstanceInfoService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceInfoService")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

impl InstanceInfoService {
    pub fn new(
        local: LocalInstance,
        crisis: Arc<dyn CrisisRepository>,
        membership: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            local,
            crisis,
            membership,
        }
    }

    /// The instance reports `red` while any of its communities is in crisis.
    pub async fn describe(&self) -> Result<InstanceInfo> {
        let community_count = self.crisis.count_communities(None).await?;
        let in_crisis = self
            .crisis
            .count_communities(Some(CommunityMode::Red))
            .await?;
        let user_count = self.membership.user_count().await?;

        Ok(InstanceInfo {
            name: self.local.name.clone(),
            description: self.local.description.clone(),
            region: self.local.region.clone(),
            url: Some(self.local.url.clone()),
            version: Some(self.local.version.clone()),
            platform_mode: Some(if in_crisis > 0 {
                CommunityMode::Red
            } else {
                CommunityMode::Blue
            }),
            community_count,
            user_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::memory::MemoryBackend;
    use chrono::Utc;
    use redsky_model::{CommunityRole, MemberId};

    #[tokio::test]
    async fn reports_red_when_any_community_is_in_crisis() {
        let backend = MemoryBackend::new();
        let service = InstanceInfoService::new(
            LocalInstance::default(),
            backend.crisis.clone(),
            backend.membership.clone(),
        );
        let shared = MemberId::new();
        backend.seed_community(&[(shared, CommunityRole::Admin)]);
        let second = backend.seed_community(&[
            (shared, CommunityRole::Member),
            (MemberId::new(), CommunityRole::Member),
        ]);

        let info = service.describe().await.unwrap();
        assert_eq!(info.platform_mode, Some(CommunityMode::Blue));
        assert_eq!(info.community_count, 2);
        assert_eq!(info.user_count, 2);

        backend
            .crisis
            .force_mode(second, CommunityMode::Red, Utc::now())
            .await
            .unwrap();
        let info = service.describe().await.unwrap();
        assert_eq!(info.platform_mode, Some(CommunityMode::Red));
    }
}
