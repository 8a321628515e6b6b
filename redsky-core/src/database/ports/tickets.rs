use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redsky_model::{
    CommunityId, EmergencyTicket, MemberId, TicketComment, TicketId, TicketStatus,
    TicketType, Urgency,
};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub community_id: CommunityId,
    pub author_id: MemberId,
    pub ticket_type: TicketType,
    pub title: String,
    pub description: Option<String>,
    pub urgency: Urgency,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
    pub urgency: Option<Urgency>,
    pub exclude_resolved: bool,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &EmergencyTicket) -> bool {
        self.ticket_type.is_none_or(|t| t == ticket.ticket_type)
            && self.status.is_none_or(|s| s == ticket.status)
            && self.urgency.is_none_or(|u| u == ticket.urgency)
            && !(self.exclude_resolved && ticket.status.is_resolved())
    }
}

/// Field changes to persist. Outer `None` leaves a field untouched; for
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TicketStatus>,
    pub urgency: Option<Urgency>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<MemberId>>,
}

impl TicketChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.urgency.is_none()
            && self.due_at.is_none()
            && self.assigned_to.is_none()
    }

    pub fn apply_to(self, ticket: &mut EmergencyTicket, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            ticket.title = title;
        }
        if let Some(description) = self.description {
            ticket.description = description;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(urgency) = self.urgency {
            ticket.urgency = urgency;
        }
        if let Some(due_at) = self.due_at {
            ticket.due_at = due_at;
        }
        if let Some(assigned_to) = self.assigned_to {
            ticket.assigned_to = assigned_to;
        }
        ticket.updated_at = now;
    }
}

/// Ticket state an update was authorized and validated against. Adapters
/// compare it with the row they lock and refuse stale updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketPrecondition {
    pub status: TicketStatus,
    pub assigned_to: Option<MemberId>,
}

impl TicketPrecondition {
    pub fn of(ticket: &EmergencyTicket) -> Self {
        Self {
            status: ticket.status,
            assigned_to: ticket.assigned_to,
        }
    }

    pub fn verify(&self, current: &EmergencyTicket) -> Result<()> {
        if Self::of(current) == *self {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "ticket {} changed while this update was being applied; reload and retry",
                current.id
            )))
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: TicketId,
    pub author_id: MemberId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: NewTicket) -> Result<EmergencyTicket>;

    async fn find(
        &self,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<Option<EmergencyTicket>>;

    /// Matching tickets of a community, newest first.
    async fn list(
        &self,
        community_id: CommunityId,
        filter: &TicketFilter,
    ) -> Result<Vec<EmergencyTicket>>;

    /// Apply `changes` only if the stored ticket still matches `expected`,
    /// otherwise fail with `Conflict`.
    async fn update(
        &self,
        ticket_id: TicketId,
        expected: TicketPrecondition,
        changes: TicketChanges,
        now: DateTime<Utc>,
    ) -> Result<EmergencyTicket>;

    async fn add_comment(&self, comment: NewComment) -> Result<TicketComment>;

    /// Comments on a ticket, oldest first.
    async fn comments(&self, ticket_id: TicketId) -> Result<Vec<TicketComment>>;
}
