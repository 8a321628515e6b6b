//! PostgreSQL infrastructure adapters implementing the database ports.

pub mod repositories;

pub use repositories::alerts::PostgresAlertRepository;
pub use repositories::crisis::PostgresCrisisRepository;
pub use repositories::instances::PostgresInstanceRepository;
pub use repositories::membership::PostgresMembershipDirectory;
pub use repositories::tickets::PostgresTicketRepository;
