//! Per-community Blue Sky / Red Sky state machine and its vote ledger.

pub mod service;
pub mod threshold;

pub use service::{CrisisService, VoteOutcome};
pub use threshold::{DepartedVoterPolicy, ThresholdRule, VoteTally};
