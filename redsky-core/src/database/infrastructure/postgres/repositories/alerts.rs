use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{AlertId, RedSkyAlert};
use sqlx::{PgPool, postgres::PgRow};

use super::{column, decode_column};
use crate::database::ports::alerts::{AlertRepository, NewAlert};
use crate::error::{CoreError, Result};

const ALERT_COLUMNS: &str = "id, source_instance_url, source_instance_name, title, body, \
     severity, origin, expires_at, dismissed, created_at";

#[derive(Debug, Clone)]
pub struct PostgresAlertRepository {
    pool: PgPool,
}

impl PostgresAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<RedSkyAlert> {
        Ok(RedSkyAlert {
            id: AlertId(column(row, "id")?),
            source_instance_url: column(row, "source_instance_url")?,
            source_instance_name: column(row, "source_instance_name")?,
            title: column(row, "title")?,
            body: column(row, "body")?,
            severity: decode_column(row, "severity")?,
            origin: decode_column(row, "origin")?,
            expires_at: column(row, "expires_at")?,
            dismissed: column(row, "dismissed")?,
            created_at: column(row, "created_at")?,
        })
    }
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn insert(&self, alert: NewAlert) -> Result<RedSkyAlert> {
        let sql = format!(
            r#"
            INSERT INTO red_sky_alerts
                (id, source_instance_url, source_instance_name, title, body,
                 severity, origin, expires_at, dismissed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9)
            RETURNING {ALERT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(AlertId::new().to_uuid())
            .bind(&alert.source_instance_url)
            .bind(&alert.source_instance_name)
            .bind(&alert.title)
            .bind(&alert.body)
            .bind(alert.severity.as_str())
            .bind(alert.origin.as_str())
            .bind(alert.expires_at)
            .bind(alert.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to store alert: {e}")))?;

        Self::map_row(&row)
    }

    async fn list(&self, active_only: bool, now: DateTime<Utc>) -> Result<Vec<RedSkyAlert>> {
        let sql = format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM red_sky_alerts
            WHERE (NOT $1 OR (NOT dismissed AND (expires_at IS NULL OR expires_at > $2)))
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(active_only)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to list alerts: {e}")))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn dismiss(&self, id: AlertId) -> Result<Option<RedSkyAlert>> {
        let sql = format!(
            "UPDATE red_sky_alerts SET dismissed = TRUE WHERE id = $1 RETURNING {ALERT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to dismiss alert: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }
}
