//! Core data model definitions shared across Red Sky crates.
#![allow(missing_docs)]

pub mod crisis;
pub mod error;
pub mod federation;
pub mod ids;
pub mod membership;
pub mod ticket;

// Intentionally curated re-exports for downstream consumers.
pub use crisis::{CommunityMode, CrisisStatus, CrisisVote, VoteDirection};
pub use error::{ModelError, Result as ModelResult};
pub use federation::{
    AlertOrigin, AlertSeverity, InstanceInfo, KnownInstance, RedSkyAlert,
};
pub use ids::{AlertId, CommentId, CommunityId, InstanceId, MemberId, TicketId, VoteId};
pub use membership::{CommunityRole, PlatformRole};
pub use ticket::{
    EmergencyTicket, TicketComment, TicketStatus, TicketType, Urgency,
};
