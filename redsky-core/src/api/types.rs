//! Request and response bodies shared by the HTTP surface and its clients.

use chrono::{DateTime, Utc};
use redsky_model::{
    AlertSeverity, CommunityMode, MemberId, TicketStatus, TicketType, Urgency,
    VoteDirection,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Standard API envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleModeRequest {
    pub mode: CommunityMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub vote_type: VoteDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub ticket_type: TicketType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTicketRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<MemberId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSort {
    #[default]
    CreatedDesc,
    PriorityDesc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketListQuery {
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
    pub urgency: Option<Urgency>,
    pub sort: Option<TicketSort>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInstanceRequest {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub reachable_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendAlertRequest {
    pub title: String,
    #[serde(default, alias = "description")]
    pub body: Option<String>,
    #[serde(default)]
    pub severity: AlertSeverity,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertListQuery {
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

impl Default for AlertListQuery {
    fn default() -> Self {
        Self { active_only: true }
    }
}

fn default_active_only() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_tells_null_from_missing() {
        let cleared: UpdateTicketRequest =
            serde_json::from_value(json!({"assigned_to": null})).unwrap();
        assert_eq!(cleared.assigned_to, Some(None));
        assert_eq!(cleared.due_at, None);

        let untouched: UpdateTicketRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(untouched.assigned_to, None);
    }

    #[test]
    fn unknown_urgency_is_a_deserialization_error() {
        let result: Result<CreateTicketRequest, _> = serde_json::from_value(json!({
            "ticket_type": "request",
            "title": "x",
            "urgency": "apocalyptic",
        }));
        assert!(result.is_err());
    }
}
