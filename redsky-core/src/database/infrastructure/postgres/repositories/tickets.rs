use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{
    CommentId, CommunityId, EmergencyTicket, MemberId, TicketComment, TicketId, TicketStatus,
};
use sqlx::{PgPool, postgres::PgRow};
use uuid::Uuid;

use super::{column, decode_column};
use crate::database::ports::tickets::{
    NewComment, NewTicket, TicketChanges, TicketFilter, TicketPrecondition, TicketRepository,
};
use crate::error::{CoreError, Result};

const TICKET_COLUMNS: &str = "id, community_id, author_id, ticket_type, title, description, \
     status, urgency, assigned_to, due_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresTicketRepository {
    pool: PgPool,
}

impl PostgresTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_ticket(row: &PgRow) -> Result<EmergencyTicket> {
        let assigned_to: Option<Uuid> = column(row, "assigned_to")?;
        Ok(EmergencyTicket {
            id: TicketId(column(row, "id")?),
            community_id: CommunityId(column(row, "community_id")?),
            author_id: MemberId(column(row, "author_id")?),
            ticket_type: decode_column(row, "ticket_type")?,
            title: column(row, "title")?,
            description: column(row, "description")?,
            status: decode_column(row, "status")?,
            urgency: decode_column(row, "urgency")?,
            assigned_to: assigned_to.map(MemberId),
            due_at: column(row, "due_at")?,
            created_at: column(row, "created_at")?,
            updated_at: column(row, "updated_at")?,
        })
    }

    fn map_comment(row: &PgRow) -> Result<TicketComment> {
        Ok(TicketComment {
            id: CommentId(column(row, "id")?),
            ticket_id: TicketId(column(row, "ticket_id")?),
            author_id: MemberId(column(row, "author_id")?),
            body: column(row, "body")?,
            created_at: column(row, "created_at")?,
        })
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn create(&self, ticket: NewTicket) -> Result<EmergencyTicket> {
        let sql = format!(
            r#"
            INSERT INTO emergency_tickets
                (id, community_id, author_id, ticket_type, title, description,
                 status, urgency, due_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(TicketId::new().to_uuid())
            .bind(ticket.community_id.to_uuid())
            .bind(ticket.author_id.to_uuid())
            .bind(ticket.ticket_type.as_str())
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(TicketStatus::Open.as_str())
            .bind(ticket.urgency.as_str())
            .bind(ticket.due_at)
            .bind(ticket.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to create ticket: {e}")))?;

        Self::map_ticket(&row)
    }

    async fn find(
        &self,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<Option<EmergencyTicket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM emergency_tickets WHERE id = $1 AND community_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(ticket_id.to_uuid())
            .bind(community_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to load ticket: {e}")))?;

        row.as_ref().map(Self::map_ticket).transpose()
    }

    async fn list(
        &self,
        community_id: CommunityId,
        filter: &TicketFilter,
    ) -> Result<Vec<EmergencyTicket>> {
        let sql = format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM emergency_tickets
            WHERE community_id = $1
              AND ($2::text IS NULL OR ticket_type = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL OR urgency = $4)
              AND (NOT $5 OR status <> 'resolved')
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(community_id.to_uuid())
            .bind(filter.ticket_type.map(|t| t.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.urgency.map(|u| u.as_str()))
            .bind(filter.exclude_resolved)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to list tickets: {e}")))?;

        rows.iter().map(Self::map_ticket).collect()
    }

    async fn update(
        &self,
        ticket_id: TicketId,
        expected: TicketPrecondition,
        changes: TicketChanges,
        now: DateTime<Utc>,
    ) -> Result<EmergencyTicket> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to begin transaction: {e}")))?;

        let sql = format!("SELECT {TICKET_COLUMNS} FROM emergency_tickets WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(ticket_id.to_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to lock ticket: {e}")))?
            .ok_or_else(|| CoreError::not_found(format!("ticket {ticket_id}")))?;
        let mut ticket = Self::map_ticket(&row)?;
        expected.verify(&ticket)?;
        changes.apply_to(&mut ticket, now);

        sqlx::query(
            r#"
            UPDATE emergency_tickets
            SET title = $2, description = $3, status = $4, urgency = $5,
                assigned_to = $6, due_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(ticket.id.to_uuid())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.urgency.as_str())
        .bind(ticket.assigned_to.map(|m| m.to_uuid()))
        .bind(ticket.due_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to update ticket: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to commit ticket update: {e}")))?;

        Ok(ticket)
    }

    async fn add_comment(&self, comment: NewComment) -> Result<TicketComment> {
        let row = sqlx::query(
            r#"
            INSERT INTO ticket_comments (id, ticket_id, author_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, ticket_id, author_id, body, created_at
            "#,
        )
        .bind(CommentId::new().to_uuid())
        .bind(comment.ticket_id.to_uuid())
        .bind(comment.author_id.to_uuid())
        .bind(&comment.body)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to add comment: {e}")))?;

        Self::map_comment(&row)
    }

    async fn comments(&self, ticket_id: TicketId) -> Result<Vec<TicketComment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, ticket_id, author_id, body, created_at
            FROM ticket_comments
            WHERE ticket_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ticket_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to list comments: {e}")))?;

        rows.iter().map(Self::map_comment).collect()
    }
}
