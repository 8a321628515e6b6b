//! # Red Sky Server
//!
//! HTTP surface for crisis voting, emergency tickets, the federation
//! directory and Red Sky alerts. Identity is taken from the `x-actor-id`
//! header set by the upstream auth layer.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
