use std::{fmt, sync::Arc};

use anyhow::Context;
use redsky_core::application::unit_of_work::AppUnitOfWork;
use redsky_core::crisis::CrisisService;
use redsky_core::federation::{
    AlertRelay, DirectoryService, InstanceInfoService, KnownPeersOnly, PeerClient, PeerVerifier,
    TrustAllPeers,
};
use redsky_core::tickets::TicketService;

use crate::infra::config::{Config, PeerTrust};

#[derive(Clone)]
pub struct AppState {
    pub unit_of_work: Arc<AppUnitOfWork>,
    pub config: Arc<Config>,
    pub crisis: Arc<CrisisService>,
    pub tickets: Arc<TicketService>,
    pub directory: Arc<DirectoryService>,
    pub relay: Arc<AlertRelay>,
    pub instance: Arc<InstanceInfoService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("unit_of_work", &self.unit_of_work)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wires every service over the given repositories and peer client,
    /// applying the crisis and federation settings from `config`.
    pub fn new(
        config: Arc<Config>,
        unit_of_work: Arc<AppUnitOfWork>,
        peers: Arc<dyn PeerClient>,
    ) -> anyhow::Result<Self> {
        let rule = config
            .crisis
            .threshold_rule()
            .context("invalid crisis threshold")?;
        let fan_out = config.federation.fan_out();
        let local = config.federation.local_instance();

        let uow = &unit_of_work;
        let crisis = CrisisService::new(Arc::clone(&uow.crisis), Arc::clone(&uow.membership))
            .with_rule(rule)
            .with_departed_voter_policy(config.crisis.departed_voters);

        let tickets = TicketService::new(
            Arc::clone(&uow.tickets),
            Arc::clone(&uow.crisis),
            Arc::clone(&uow.membership),
        );

        let directory = DirectoryService::new(
            Arc::clone(&uow.instances),
            Arc::clone(&uow.membership),
            Arc::clone(&peers),
        )
        .with_settings(fan_out);

        let verifier: Arc<dyn PeerVerifier> = match config.federation.trust {
            PeerTrust::Any => Arc::new(TrustAllPeers),
            PeerTrust::Known => Arc::new(KnownPeersOnly::new(Arc::clone(&uow.instances))),
        };
        let relay = AlertRelay::new(
            Arc::clone(&uow.alerts),
            Arc::clone(&uow.instances),
            Arc::clone(&uow.membership),
            peers,
            local.clone(),
        )
        .with_verifier(verifier)
        .with_settings(fan_out);

        let instance =
            InstanceInfoService::new(local, Arc::clone(&uow.crisis), Arc::clone(&uow.membership));

        Ok(Self {
            crisis: Arc::new(crisis),
            tickets: Arc::new(tickets),
            directory: Arc::new(directory),
            relay: Arc::new(relay),
            instance: Arc::new(instance),
            unit_of_work,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn unit_of_work(&self) -> &AppUnitOfWork {
        &self.unit_of_work
    }
}
