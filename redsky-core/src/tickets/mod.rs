//! Emergency ticket lifecycle and triage ordering.

pub mod lifecycle;
pub mod service;
pub mod triage;

pub use service::{TicketPage, TicketService};
pub use triage::{ScoredTicket, TriageScore, triage_score};
