use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{AlertId, AlertOrigin, AlertSeverity, RedSkyAlert};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub source_instance_url: String,
    pub source_instance_name: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub severity: AlertSeverity,
    pub origin: AlertOrigin,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: NewAlert) -> Result<RedSkyAlert>;

    /// Alerts newest first. With `active_only`, dismissed alerts and alerts
    /// expired at `now` are left out.
    async fn list(&self, active_only: bool, now: DateTime<Utc>) -> Result<Vec<RedSkyAlert>>;

    /// Mark an alert dismissed, returning the updated row if it exists.
    async fn dismiss(&self, id: AlertId) -> Result<Option<RedSkyAlert>>;
}
