use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{CommentId, CommunityId, MemberId, TicketId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TicketType {
    Request,
    Offer,
    /// Urgent broadcast that may only be raised while the community is in
    /// Red Sky mode.
    EmergencyPing,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Request => "request",
            TicketType::Offer => "offer",
            TicketType::EmergencyPing => "emergency_ping",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(TicketType::Request),
            "offer" => Ok(TicketType::Offer),
            "emergency_ping" => Ok(TicketType::EmergencyPing),
            other => Err(ModelError::unknown("ticket type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TicketStatus::Resolved)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(ModelError::unknown("ticket status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    /// Ordinal weight used by triage scoring (low=1 .. critical=4).
    pub fn weight(&self) -> u32 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High => 3,
            Urgency::Critical => 4,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            other => Err(ModelError::unknown("urgency", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmergencyTicket {
    pub id: TicketId,
    pub community_id: CommunityId,
    pub author_id: MemberId,
    pub ticket_type: TicketType,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub urgency: Urgency,
    pub assigned_to: Option<MemberId>,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmergencyTicket {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_resolved() && self.due_at.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TicketComment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub author_id: MemberId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_weights_are_strictly_ordered() {
        let weights: Vec<u32> = [Urgency::Low, Urgency::Medium, Urgency::High, Urgency::Critical]
            .iter()
            .map(Urgency::weight)
            .collect();
        assert_eq!(weights, vec![1, 2, 3, 4]);
    }

    #[test]
    fn emergency_ping_parses_from_snake_case() {
        assert_eq!(
            "emergency_ping".parse::<TicketType>().unwrap(),
            TicketType::EmergencyPing
        );
        assert!("EmergencyPing".parse::<TicketType>().is_err());
    }
}
