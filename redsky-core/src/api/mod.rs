//! Wire contract of the HTTP API: route templates and request/response types.

pub mod routes;
pub mod types;

pub use types::*;
