use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{InstanceId, InstanceInfo, KnownInstance};

use crate::error::Result;

#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert or update the entry for `instance_url` with fresh metadata and
    /// mark it reachable.
    async fn upsert_seen(
        &self,
        instance_url: &str,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<KnownInstance>;

    /// Refresh metadata of an existing entry and mark it reachable. Returns
    /// `None` without writing anything when `id` no longer exists.
    async fn record_seen(
        &self,
        id: InstanceId,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<KnownInstance>>;

    /// Flag a peer as unreachable while keeping its last known metadata and
    /// `last_seen_at`.
    async fn mark_unreachable(&self, id: InstanceId) -> Result<()>;

    /// Entries ordered by `last_seen_at`, most recent first.
    async fn list(&self, reachable_only: bool) -> Result<Vec<KnownInstance>>;

    async fn find(&self, id: InstanceId) -> Result<Option<KnownInstance>>;

    async fn delete(&self, id: InstanceId) -> Result<bool>;
}
