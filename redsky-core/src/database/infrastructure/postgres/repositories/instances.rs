use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{CommunityMode, InstanceId, InstanceInfo, KnownInstance};
use sqlx::{PgPool, postgres::PgRow};

use super::column;
use crate::database::ports::instances::InstanceRepository;
use crate::error::{CoreError, Result};

const INSTANCE_COLUMNS: &str = "id, instance_url, name, description, region, version, \
     platform_mode, community_count, user_count, is_reachable, last_seen_at, created_at";

#[derive(Debug, Clone)]
pub struct PostgresInstanceRepository {
    pool: PgPool,
}

impl PostgresInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<KnownInstance> {
        let platform_mode: Option<String> = column(row, "platform_mode")?;
        let platform_mode = platform_mode
            .map(|raw| raw.parse::<CommunityMode>())
            .transpose()
            .map_err(|e| CoreError::Internal(format!("Invalid platform_mode: {e}")))?;
        let community_count: i32 = column(row, "community_count")?;
        let user_count: i32 = column(row, "user_count")?;

        Ok(KnownInstance {
            id: InstanceId(column(row, "id")?),
            instance_url: column(row, "instance_url")?,
            name: column(row, "name")?,
            description: column(row, "description")?,
            region: column(row, "region")?,
            version: column(row, "version")?,
            platform_mode,
            community_count: community_count.max(0) as u32,
            user_count: user_count.max(0) as u32,
            is_reachable: column(row, "is_reachable")?,
            last_seen_at: column(row, "last_seen_at")?,
            created_at: column(row, "created_at")?,
        })
    }
}

#[async_trait]
impl InstanceRepository for PostgresInstanceRepository {
    async fn upsert_seen(
        &self,
        instance_url: &str,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<KnownInstance> {
        let sql = format!(
            r#"
            INSERT INTO known_instances
                (id, instance_url, name, description, region, version, platform_mode,
                 community_count, user_count, is_reachable, last_seen_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10)
            ON CONFLICT (instance_url) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                region = EXCLUDED.region,
                version = EXCLUDED.version,
                platform_mode = EXCLUDED.platform_mode,
                community_count = EXCLUDED.community_count,
                user_count = EXCLUDED.user_count,
                is_reachable = TRUE,
                last_seen_at = EXCLUDED.last_seen_at
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(InstanceId::new().to_uuid())
            .bind(instance_url)
            .bind(&info.name)
            .bind(&info.description)
            .bind(&info.region)
            .bind(&info.version)
            .bind(info.platform_mode.map(|m| m.as_str()))
            .bind(i32::try_from(info.community_count).unwrap_or(i32::MAX))
            .bind(i32::try_from(info.user_count).unwrap_or(i32::MAX))
            .bind(seen_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to upsert known instance: {e}")))?;

        Self::map_row(&row)
    }

    async fn record_seen(
        &self,
        id: InstanceId,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<KnownInstance>> {
        let sql = format!(
            r#"
            UPDATE known_instances SET
                name = $2,
                description = $3,
                region = $4,
                version = $5,
                platform_mode = $6,
                community_count = $7,
                user_count = $8,
                is_reachable = TRUE,
                last_seen_at = $9
            WHERE id = $1
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .bind(&info.name)
            .bind(&info.description)
            .bind(&info.region)
            .bind(&info.version)
            .bind(info.platform_mode.map(|m| m.as_str()))
            .bind(i32::try_from(info.community_count).unwrap_or(i32::MAX))
            .bind(i32::try_from(info.user_count).unwrap_or(i32::MAX))
            .bind(seen_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to record instance sighting: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn mark_unreachable(&self, id: InstanceId) -> Result<()> {
        sqlx::query("UPDATE known_instances SET is_reachable = FALSE WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CoreError::Internal(format!("Failed to mark instance unreachable: {e}"))
            })?;
        Ok(())
    }

    async fn list(&self, reachable_only: bool) -> Result<Vec<KnownInstance>> {
        let sql = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM known_instances
            WHERE (NOT $1 OR is_reachable)
            ORDER BY last_seen_at DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(reachable_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to list known instances: {e}")))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn find(&self, id: InstanceId) -> Result<Option<KnownInstance>> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM known_instances WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to load known instance: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn delete(&self, id: InstanceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM known_instances WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to delete known instance: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
