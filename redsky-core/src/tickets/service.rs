use std::{fmt, sync::Arc};

use chrono::Utc;
use redsky_model::{
    CommunityId, EmergencyTicket, MemberId, TicketComment, TicketId, TicketType,
};
use serde::Serialize;
use tracing::info;

use crate::access;
use crate::api::types::{
    CreateTicketRequest, TicketListQuery, TicketSort, UpdateTicketRequest,
};
use crate::database::ports::{
    crisis::CrisisRepository,
    membership::MembershipDirectory,
    tickets::{
        NewComment, NewTicket, TicketChanges, TicketFilter, TicketPrecondition,
        TicketRepository,
    },
};
use crate::error::{CoreError, Result};
use crate::tickets::{
    lifecycle::{self, Editor},
    triage::{self, ScoredTicket},
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub items: Vec<ScoredTicket>,
    pub total: usize,
    pub skip: u32,
    pub limit: u32,
}

#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    crisis: Arc<dyn CrisisRepository>,
    membership: Arc<dyn MembershipDirectory>,
}

impl fmt::Debug for TicketService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketService").finish_non_exhaustive()
    }
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        crisis: Arc<dyn CrisisRepository>,
        membership: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            tickets,
            crisis,
            membership,
        }
    }

    pub async fn create(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        request: CreateTicketRequest,
    ) -> Result<ScoredTicket> {
        let state = self
            .crisis
            .crisis_state(community_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("community {community_id}")))?;
        access::require_member(self.membership.as_ref(), community_id, actor).await?;

        let title = lifecycle::validate_title(&request.title)?;
        let description = lifecycle::validate_description(request.description)?;

        if request.ticket_type == TicketType::EmergencyPing && !state.mode.is_crisis() {
            return Err(CoreError::Gated(
                "Emergency pings are only available in Red Sky (crisis) mode".into(),
            ));
        }

        let now = Utc::now();
        let ticket = self
            .tickets
            .create(NewTicket {
                community_id,
                author_id: actor,
                ticket_type: request.ticket_type,
                title,
                description,
                urgency: request.urgency.unwrap_or_default(),
                due_at: request.due_at,
                created_at: now,
            })
            .await?;

        info!(
            %community_id,
            ticket_id = %ticket.id,
            ticket_type = %ticket.ticket_type,
            urgency = %ticket.urgency,
            "emergency ticket created"
        );
        Ok(ScoredTicket::new(ticket, now))
    }

    pub async fn list(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        query: TicketListQuery,
    ) -> Result<TicketPage> {
        access::require_member(self.membership.as_ref(), community_id, actor).await?;

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(CoreError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let skip = query.skip.unwrap_or(0);

        let filter = TicketFilter {
            ticket_type: query.ticket_type,
            status: query.status,
            urgency: query.urgency,
            exclude_resolved: false,
        };
        let now = Utc::now();
        let mut items: Vec<ScoredTicket> = self
            .tickets
            .list(community_id, &filter)
            .await?
            .into_iter()
            .map(|ticket| ScoredTicket::new(ticket, now))
            .collect();

        if query.sort.unwrap_or_default() == TicketSort::PriorityDesc {
            items.sort_by(triage::by_priority);
        }

        let total = items.len();
        let items = items
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();

        Ok(TicketPage {
            items,
            total,
            skip,
            limit,
        })
    }

    /// Every unresolved ticket, most urgent first.
    pub async fn triage(
        &self,
        actor: MemberId,
        community_id: CommunityId,
    ) -> Result<Vec<ScoredTicket>> {
        access::require_coordinator(
            self.membership.as_ref(),
            community_id,
            actor,
            "access the triage view",
        )
        .await?;

        let filter = TicketFilter {
            exclude_resolved: true,
            ..TicketFilter::default()
        };
        let tickets = self.tickets.list(community_id, &filter).await?;
        Ok(triage::rank(tickets, Utc::now()))
    }

    pub async fn get(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<ScoredTicket> {
        access::require_member(self.membership.as_ref(), community_id, actor).await?;
        let ticket = self.load(community_id, ticket_id).await?;
        Ok(ScoredTicket::with_breakdown(ticket, Utc::now()))
    }

    pub async fn update(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        ticket_id: TicketId,
        request: UpdateTicketRequest,
    ) -> Result<ScoredTicket> {
        let role = access::require_member(self.membership.as_ref(), community_id, actor).await?;
        let ticket = self.load(community_id, ticket_id).await?;

        let edits_fields = request.title.is_some()
            || request.description.is_some()
            || request.status.is_some()
            || request.urgency.is_some()
            || request.due_at.is_some();
        lifecycle::authorize_update(
            &ticket,
            Editor {
                member_id: actor,
                role,
            },
            edits_fields,
            request.assigned_to,
        )?;

        let changes = self.validate_changes(&ticket, request).await?;
        let now = Utc::now();
        if changes.is_empty() {
            return Ok(ScoredTicket::with_breakdown(ticket, now));
        }

        let previous_status = ticket.status;
        let updated = self
            .tickets
            .update(ticket_id, TicketPrecondition::of(&ticket), changes, now)
            .await?;
        if updated.status != previous_status {
            info!(
                %community_id,
                %ticket_id,
                from = %previous_status,
                to = %updated.status,
                member_id = %actor,
                "ticket status changed"
            );
        }
        Ok(ScoredTicket::with_breakdown(updated, now))
    }

    pub async fn add_comment(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        ticket_id: TicketId,
        body: &str,
    ) -> Result<TicketComment> {
        access::require_member(self.membership.as_ref(), community_id, actor).await?;
        let body = lifecycle::validate_comment(body)?;
        self.load(community_id, ticket_id).await?;

        self.tickets
            .add_comment(NewComment {
                ticket_id,
                author_id: actor,
                body,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn comments(
        &self,
        actor: MemberId,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<Vec<TicketComment>> {
        access::require_member(self.membership.as_ref(), community_id, actor).await?;
        self.load(community_id, ticket_id).await?;
        self.tickets.comments(ticket_id).await
    }

    async fn load(
        &self,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<EmergencyTicket> {
        self.tickets
            .find(community_id, ticket_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("ticket {ticket_id}")))
    }

    async fn validate_changes(
        &self,
        ticket: &EmergencyTicket,
        request: UpdateTicketRequest,
    ) -> Result<TicketChanges> {
        let title = request
            .title
            .as_deref()
            .map(lifecycle::validate_title)
            .transpose()?;
        let description = request
            .description
            .map(lifecycle::validate_description)
            .transpose()?;

        if let Some(status) = request.status {
            lifecycle::check_transition(ticket.status, status)?;
        }

        if let Some(Some(assignee)) = request.assigned_to {
            let is_member = self
                .membership
                .community_role(ticket.community_id, assignee)
                .await?
                .is_some();
            if !is_member {
                return Err(CoreError::validation(
                    "Assignee must be a member of this community",
                ));
            }
        }

        Ok(TicketChanges {
            title,
            description,
            status: request.status.filter(|status| *status != ticket.status),
            urgency: request.urgency,
            due_at: request.due_at,
            assigned_to: request.assigned_to,
        })
    }
}
