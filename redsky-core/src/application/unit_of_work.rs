use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::database::ports::{
    alerts::AlertRepository, crisis::CrisisRepository, instances::InstanceRepository,
    membership::MembershipDirectory, tickets::TicketRepository,
};
#[cfg(feature = "database")]
use crate::database::{
    infrastructure::postgres::{
        PostgresAlertRepository, PostgresCrisisRepository, PostgresInstanceRepository,
        PostgresMembershipDirectory, PostgresTicketRepository,
    },
    postgres::PostgresDatabase,
};

/// Aggregates all repository ports used by application services.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub crisis: Arc<dyn CrisisRepository>,
    pub membership: Arc<dyn MembershipDirectory>,
    pub tickets: Arc<dyn TicketRepository>,
    pub instances: Arc<dyn InstanceRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("crisis", &type_name_of_val(self.crisis.as_ref()))
            .field("membership", &type_name_of_val(self.membership.as_ref()))
            .field("tickets", &type_name_of_val(self.tickets.as_ref()))
            .field("instances", &type_name_of_val(self.instances.as_ref()))
            .field("alerts", &type_name_of_val(self.alerts.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    /// Wire every port to its Postgres adapter over a shared pool.
    #[cfg(feature = "database")]
    pub fn from_postgres(db: &PostgresDatabase) -> Self {
        let pool = db.pool().clone();
        Self {
            crisis: Arc::new(PostgresCrisisRepository::new(pool.clone())),
            membership: Arc::new(PostgresMembershipDirectory::new(pool.clone())),
            tickets: Arc::new(PostgresTicketRepository::new(pool.clone())),
            instances: Arc::new(PostgresInstanceRepository::new(pool.clone())),
            alerts: Arc::new(PostgresAlertRepository::new(pool)),
        }
    }
}
