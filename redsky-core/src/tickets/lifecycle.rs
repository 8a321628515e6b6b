use redsky_model::{CommunityRole, EmergencyTicket, MemberId, TicketStatus};

use crate::error::{CoreError, Result};

pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Status moves allowed on a ticket. Resolved tickets must be reopened
/// before work can resume on them.
pub fn check_transition(from: TicketStatus, to: TicketStatus) -> Result<()> {
    use TicketStatus::*;
    match (from, to) {
        (a, b) if a == b => Ok(()),
        (Open, InProgress) | (Open, Resolved) => Ok(()),
        (InProgress, Resolved) | (InProgress, Open) => Ok(()),
        (Resolved, Open) => Ok(()),
        (Resolved, InProgress) => Err(CoreError::validation(
            "Resolved tickets must be reopened before moving to in_progress",
        )),
        _ => Err(CoreError::validation(format!(
            "Cannot move ticket from {from} to {to}"
        ))),
    }
}

/// Who is attempting an edit and in what capacity.
#[derive(Debug, Clone, Copy)]
pub struct Editor {
    pub member_id: MemberId,
    pub role: CommunityRole,
}

impl Editor {
    fn is_participant(&self, ticket: &EmergencyTicket) -> bool {
        ticket.author_id == self.member_id || ticket.assigned_to == Some(self.member_id)
    }
}

/// Check an update against the current ticket.
///
/// `edits_fields` covers everything except the assignee. `assignment` is the
/// requested assignee change, if any.
pub fn authorize_update(
    ticket: &EmergencyTicket,
    editor: Editor,
    edits_fields: bool,
    assignment: Option<Option<MemberId>>,
) -> Result<()> {
    let coordinator = editor.role.is_coordinator();

    if edits_fields && !(coordinator || editor.is_participant(ticket)) {
        return Err(CoreError::forbidden(
            "Only the author, the assignee, leaders, or admins can update this ticket",
        ));
    }

    match assignment {
        None => Ok(()),
        Some(Some(target)) if target == editor.member_id => Ok(()),
        Some(Some(_)) if coordinator => Ok(()),
        Some(Some(_)) => Err(CoreError::forbidden(
            "Only leaders and admins can assign tickets to other members",
        )),
        Some(None) if coordinator || ticket.assigned_to == Some(editor.member_id) => Ok(()),
        Some(None) => Err(CoreError::forbidden(
            "Only the assignee, leaders, or admins can unassign this ticket",
        )),
    }
}

pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("Title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(CoreError::validation(format!(
            "Title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: Option<String>) -> Result<Option<String>> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_CHARS => Err(CoreError::validation(
            format!("Description must be at most {MAX_DESCRIPTION_CHARS} characters"),
        )),
        Some(text) if text.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

pub fn validate_comment(body: &str) -> Result<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("Comment must not be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(CoreError::validation(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redsky_model::{CommunityId, TicketId, TicketType, Urgency};

    fn ticket(author: MemberId, assignee: Option<MemberId>) -> EmergencyTicket {
        let now = Utc::now();
        EmergencyTicket {
            id: TicketId::new(),
            community_id: CommunityId::new(),
            author_id: author,
            ticket_type: TicketType::Offer,
            title: "Spare generator".into(),
            description: None,
            status: TicketStatus::Open,
            urgency: Urgency::Medium,
            assigned_to: assignee,
            due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(id: MemberId) -> Editor {
        Editor {
            member_id: id,
            role: CommunityRole::Member,
        }
    }

    #[test]
    fn reopen_is_allowed_but_resolved_cannot_jump_to_in_progress() {
        assert!(check_transition(TicketStatus::Resolved, TicketStatus::Open).is_ok());
        assert!(check_transition(TicketStatus::Open, TicketStatus::Resolved).is_ok());
        assert!(check_transition(TicketStatus::InProgress, TicketStatus::InProgress).is_ok());
        assert!(check_transition(TicketStatus::Resolved, TicketStatus::InProgress).is_err());
    }

    #[test]
    fn bystanders_cannot_edit_but_may_self_assign() {
        let author = MemberId::new();
        let bystander = MemberId::new();
        let ticket = ticket(author, None);

        assert!(authorize_update(&ticket, member(bystander), true, None).is_err());
        assert!(authorize_update(&ticket, member(bystander), false, Some(Some(bystander))).is_ok());
        assert!(authorize_update(&ticket, member(author), true, None).is_ok());
    }

    #[test]
    fn only_coordinators_assign_others() {
        let author = MemberId::new();
        let other = MemberId::new();
        let ticket = ticket(author, None);

        assert!(authorize_update(&ticket, member(author), false, Some(Some(other))).is_err());
        let leader = Editor {
            member_id: MemberId::new(),
            role: CommunityRole::Leader,
        };
        assert!(authorize_update(&ticket, leader, true, Some(Some(other))).is_ok());
    }

    #[test]
    fn assignee_may_edit_and_unassign_themselves() {
        let assignee = MemberId::new();
        let ticket = ticket(MemberId::new(), Some(assignee));
        assert!(authorize_update(&ticket, member(assignee), true, Some(None)).is_ok());
        assert!(authorize_update(&ticket, member(MemberId::new()), false, Some(None)).is_err());
    }

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(validate_title("  Water  ").unwrap(), "Water");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(301)).is_err());
        assert!(validate_title(&"x".repeat(300)).is_ok());
    }
}
