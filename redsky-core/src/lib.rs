//! # Red Sky Core
//!
//! Domain services for the crisis-coordination core of a community
//! resource-sharing platform.
//!
//! - **Crisis voting**: members vote a community between Blue Sky (normal)
//!   and Red Sky (crisis) mode; a configurable share of the membership
//!   flips the mode.
//! - **Emergency tickets**: requests, offers and crisis-only emergency pings,
//!   ranked for coordinators by urgency, age and due date.
//! - **Federation**: a directory of peer instances and a relay that fans
//!   Red Sky alerts out to every known peer.
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL adapters for every repository port
//! - `test-utils`: in-memory adapters and a scripted peer client
//!
//! ## Architecture
//!
//! Services depend only on the async traits in [`database::ports`]. The
//! server wires them to Postgres through [`application::unit_of_work`];
//! tests wire them to the in-memory backend.

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Membership checks shared by the services
pub mod access;

/// Route templates and wire types
pub mod api;

/// Aggregated repository ports
pub mod application;

/// Vote ledger and crisis state machine
pub mod crisis;

/// Repository ports and adapters
pub mod database;

/// Error types and error handling utilities
pub mod error;

/// Peer directory, instance description and alert relay
pub mod federation;

/// Emergency ticket lifecycle and triage
pub mod tickets;

/// Scripted collaborators for service and HTTP tests
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{CoreError, Result};
