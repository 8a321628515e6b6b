//! Repository ports consumed by the domain services.
//!
//! Each port is an object-safe async trait so services can hold
//! `Arc<dyn Port>` and tests can swap in the in-memory adapters.

pub mod alerts;
pub mod crisis;
pub mod instances;
pub mod membership;
pub mod tickets;
