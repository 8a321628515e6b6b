//! HTTP handlers. Each module maps one service onto its routes; the
//! services own all validation and authorization.

pub mod alerts;
pub mod crisis;
pub mod directory;
pub mod instance;
pub mod tickets;
