//! Deterministic priority scoring for emergency tickets.
//!
//! Urgency occupies its own band of [`URGENCY_BAND`] points. Age and overdue
//! bonuses together stay below one band, so a higher urgency always ranks
//! first and age only orders tickets of equal urgency.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use redsky_model::EmergencyTicket;
use serde::Serialize;

pub const URGENCY_BAND: u32 = 1000;
pub const OVERDUE_BONUS: u32 = 500;
pub const MAX_AGE_HOURS: u32 = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriageScore {
    pub total: u32,
    pub urgency_weight: u32,
    pub age_hours: u32,
    pub overdue: bool,
}

pub fn triage_score(ticket: &EmergencyTicket, now: DateTime<Utc>) -> TriageScore {
    let urgency_weight = ticket.urgency.weight();
    let (age_hours, overdue) = if ticket.status.is_resolved() {
        (0, false)
    } else {
        let hours = (now - ticket.created_at).num_hours().clamp(0, i64::from(MAX_AGE_HOURS));
        (hours as u32, ticket.is_overdue(now))
    };
    let overdue_bonus = if overdue { OVERDUE_BONUS } else { 0 };

    TriageScore {
        total: urgency_weight * URGENCY_BAND + overdue_bonus + age_hours,
        urgency_weight,
        age_hours,
        overdue,
    }
}

/// A ticket together with its score at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTicket {
    #[serde(flatten)]
    pub ticket: EmergencyTicket,
    pub triage_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<TriageScore>,
}

impl ScoredTicket {
    pub fn new(ticket: EmergencyTicket, now: DateTime<Utc>) -> Self {
        let score = triage_score(&ticket, now);
        Self {
            ticket,
            triage_score: score.total,
            score_breakdown: None,
        }
    }

    pub fn with_breakdown(ticket: EmergencyTicket, now: DateTime<Utc>) -> Self {
        let score = triage_score(&ticket, now);
        Self {
            ticket,
            triage_score: score.total,
            score_breakdown: Some(score),
        }
    }
}

/// Highest score first; ties go to the oldest ticket, then the lowest id.
pub fn by_priority(a: &ScoredTicket, b: &ScoredTicket) -> Ordering {
    b.triage_score
        .cmp(&a.triage_score)
        .then_with(|| a.ticket.created_at.cmp(&b.ticket.created_at))
        .then_with(|| a.ticket.id.cmp(&b.ticket.id))
}

/// Score and order tickets for the triage view.
pub fn rank(tickets: Vec<EmergencyTicket>, now: DateTime<Utc>) -> Vec<ScoredTicket> {
    let mut scored: Vec<ScoredTicket> = tickets
        .into_iter()
        .map(|ticket| ScoredTicket::with_breakdown(ticket, now))
        .collect();
    scored.sort_by(by_priority);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use redsky_model::{CommunityId, MemberId, TicketId, TicketStatus, TicketType, Urgency};

    fn ticket(
        urgency: Urgency,
        created_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    ) -> EmergencyTicket {
        EmergencyTicket {
            id: TicketId::new(),
            community_id: CommunityId::new(),
            author_id: MemberId::new(),
            ticket_type: TicketType::Request,
            title: "Need water".into(),
            description: None,
            status: TicketStatus::Open,
            urgency,
            assigned_to: None,
            due_at,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn fresh_critical_outranks_old_overdue_low() {
        let now = Utc::now();
        let fresh = ticket(Urgency::Critical, now, None);
        let stale = ticket(
            Urgency::Low,
            now - Duration::days(10),
            Some(now - Duration::days(1)),
        );

        let ranked = rank(vec![stale.clone(), fresh.clone()], now);
        assert_eq!(ranked[0].ticket.id, fresh.id);
        assert_eq!(ranked[0].triage_score, 4000);
        assert_eq!(ranked[1].triage_score, 1000 + 500 + 240);
    }

    #[test]
    fn age_and_overdue_never_cross_an_urgency_band() {
        let now = Utc::now();
        let worst_high = ticket(
            Urgency::High,
            now - Duration::days(365),
            Some(now - Duration::days(300)),
        );
        let new_critical = ticket(Urgency::Critical, now, None);
        assert!(triage_score(&worst_high, now).total < triage_score(&new_critical, now).total);
        assert_eq!(triage_score(&worst_high, now).age_hours, MAX_AGE_HOURS);
    }

    #[test]
    fn resolved_tickets_lose_age_and_overdue_terms() {
        let now = Utc::now();
        let mut done = ticket(
            Urgency::Medium,
            now - Duration::hours(30),
            Some(now - Duration::hours(2)),
        );
        done.status = TicketStatus::Resolved;
        let score = triage_score(&done, now);
        assert_eq!(score.total, 2000);
        assert!(!score.overdue);
    }

    #[test]
    fn equal_scores_prefer_the_older_ticket() {
        let now = Utc::now();
        let created = now - Duration::minutes(30);
        let older = ticket(Urgency::High, created - Duration::minutes(10), None);
        let newer = ticket(Urgency::High, created, None);
        let ranked = rank(vec![newer.clone(), older.clone()], now);
        assert_eq!(ranked[0].triage_score, ranked[1].triage_score);
        assert_eq!(ranked[0].ticket.id, older.id);
    }

    #[test]
    fn future_due_dates_are_not_overdue() {
        let now = Utc::now();
        let pending = ticket(Urgency::Low, now - Duration::hours(3), Some(now + Duration::hours(1)));
        let score = triage_score(&pending, now);
        assert!(!score.overdue);
        assert_eq!(score.total, 1003);
    }
}
