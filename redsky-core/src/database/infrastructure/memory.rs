//! Process-local implementations of every repository port.
//!
//! Crisis state is guarded per community by an async mutex, which gives the
//! same single-transition guarantee as the row lock used by Postgres.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use redsky_model::{
    AlertId, CommunityId, CommunityMode, CommunityRole, CrisisVote, EmergencyTicket,
    InstanceId, InstanceInfo, KnownInstance, MemberId, PlatformRole, RedSkyAlert,
    TicketComment, TicketId, VoteId, CommentId,
};
use tokio::sync::Mutex;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::crisis::threshold::{VoteTally, evaluate_transition};
use crate::database::ports::{
    alerts::{AlertRepository, NewAlert},
    crisis::{CommunityCrisisRecord, CrisisRepository, NewCrisisVote, TallyContext, VoteCommit},
    instances::InstanceRepository,
    membership::MembershipDirectory,
    tickets::{
        NewComment, NewTicket, TicketChanges, TicketFilter, TicketPrecondition,
        TicketRepository,
    },
};
use crate::error::{CoreError, Result};

#[derive(Debug)]
struct CommunityLedger {
    record: CommunityCrisisRecord,
    votes: Vec<CrisisVote>,
}

impl CommunityLedger {
    fn tally(&self, epoch: i64, eligible: Option<&HashSet<MemberId>>) -> VoteTally {
        VoteTally::from_votes(
            self.votes
                .iter()
                .filter(|vote| vote.epoch == epoch)
                .map(|vote| (&vote.member_id, vote.direction)),
            eligible,
        )
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCrisisRepository {
    communities: DashMap<CommunityId, Arc<Mutex<CommunityLedger>>>,
}

impl InMemoryCrisisRepository {
    pub fn insert_community(&self, community_id: CommunityId) {
        self.communities.entry(community_id).or_insert_with(|| {
            Arc::new(Mutex::new(CommunityLedger {
                record: CommunityCrisisRecord {
                    community_id,
                    mode: CommunityMode::Blue,
                    transition_epoch: 0,
                    mode_changed_at: None,
                },
                votes: Vec::new(),
            }))
        });
    }

    fn ledger(&self, community_id: CommunityId) -> Option<Arc<Mutex<CommunityLedger>>> {
        self.communities
            .get(&community_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn require_ledger(&self, community_id: CommunityId) -> Result<Arc<Mutex<CommunityLedger>>> {
        self.ledger(community_id)
            .ok_or_else(|| CoreError::not_found(format!("community {community_id}")))
    }
}

#[async_trait]
impl CrisisRepository for InMemoryCrisisRepository {
    async fn crisis_state(
        &self,
        community_id: CommunityId,
    ) -> Result<Option<CommunityCrisisRecord>> {
        match self.ledger(community_id) {
            Some(ledger) => Ok(Some(ledger.lock().await.record.clone())),
            None => Ok(None),
        }
    }

    async fn tally(
        &self,
        community_id: CommunityId,
        epoch: i64,
        eligible_voters: Option<&HashSet<MemberId>>,
    ) -> Result<VoteTally> {
        let ledger = self.require_ledger(community_id)?;
        let ledger = ledger.lock().await;
        Ok(ledger.tally(epoch, eligible_voters))
    }

    async fn cast_vote(&self, vote: NewCrisisVote, context: &TallyContext) -> Result<VoteCommit> {
        let ledger = self.require_ledger(vote.community_id)?;
        let mut ledger = ledger.lock().await;
        let epoch = ledger.record.transition_epoch;

        let duplicate = ledger.votes.iter().any(|existing| {
            existing.epoch == epoch
                && existing.member_id == vote.member_id
                && existing.direction == vote.direction
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "You have already voted to {} in this round",
                vote.direction
            )));
        }

        let recorded = CrisisVote {
            id: VoteId::new(),
            community_id: vote.community_id,
            member_id: vote.member_id,
            direction: vote.direction,
            epoch,
            cast_at: vote.cast_at,
        };
        ledger.votes.push(recorded.clone());

        let tally = ledger.tally(epoch, context.eligible_voters.as_ref());
        let transitioned_to =
            evaluate_transition(ledger.record.mode, tally, context.total_members, context.rule);
        if let Some(mode) = transitioned_to {
            ledger.record.mode = mode;
            ledger.record.transition_epoch += 1;
            ledger.record.mode_changed_at = Some(vote.cast_at);
        }

        Ok(VoteCommit {
            vote: recorded,
            tally,
            transitioned_to,
            state: ledger.record.clone(),
        })
    }

    async fn force_mode(
        &self,
        community_id: CommunityId,
        mode: CommunityMode,
        now: DateTime<Utc>,
    ) -> Result<CommunityCrisisRecord> {
        let ledger = self.require_ledger(community_id)?;
        let mut ledger = ledger.lock().await;
        ledger.record.mode = mode;
        ledger.record.transition_epoch += 1;
        ledger.record.mode_changed_at = Some(now);
        Ok(ledger.record.clone())
    }

    async fn count_communities(&self, mode: Option<CommunityMode>) -> Result<u32> {
        let ledgers: Vec<_> = self
            .communities
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut count = 0;
        for ledger in ledgers {
            let current = ledger.lock().await.record.mode;
            if mode.is_none_or(|wanted| wanted == current) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMembershipDirectory {
    communities: DashMap<CommunityId, HashMap<MemberId, CommunityRole>>,
    platform_roles: DashMap<MemberId, PlatformRole>,
}

impl InMemoryMembershipDirectory {
    pub fn add_member(&self, community_id: CommunityId, member_id: MemberId, role: CommunityRole) {
        self.communities
            .entry(community_id)
            .or_default()
            .insert(member_id, role);
    }

    pub fn remove_member(&self, community_id: CommunityId, member_id: MemberId) {
        if let Some(mut members) = self.communities.get_mut(&community_id) {
            members.remove(&member_id);
        }
    }

    pub fn set_platform_role(&self, member_id: MemberId, role: PlatformRole) {
        self.platform_roles.insert(member_id, role);
    }

    fn is_known(&self, member_id: MemberId) -> bool {
        self.communities
            .iter()
            .any(|entry| entry.value().contains_key(&member_id))
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn community_role(
        &self,
        community_id: CommunityId,
        member_id: MemberId,
    ) -> Result<Option<CommunityRole>> {
        Ok(self
            .communities
            .get(&community_id)
            .and_then(|members| members.get(&member_id).copied()))
    }

    async fn member_count(&self, community_id: CommunityId) -> Result<u32> {
        Ok(self
            .communities
            .get(&community_id)
            .map(|members| members.len() as u32)
            .unwrap_or(0))
    }

    async fn member_ids(&self, community_id: CommunityId) -> Result<Vec<MemberId>> {
        Ok(self
            .communities
            .get(&community_id)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn platform_role(&self, member_id: MemberId) -> Result<Option<PlatformRole>> {
        if let Some(role) = self.platform_roles.get(&member_id) {
            return Ok(Some(*role.value()));
        }
        Ok(self.is_known(member_id).then_some(PlatformRole::Member))
    }

    async fn user_count(&self) -> Result<u32> {
        let mut users: HashSet<MemberId> = self
            .platform_roles
            .iter()
            .map(|entry| *entry.key())
            .collect();
        for entry in self.communities.iter() {
            users.extend(entry.value().keys().copied());
        }
        Ok(users.len() as u32)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTicketRepository {
    tickets: Mutex<HashMap<TicketId, EmergencyTicket>>,
    comments: Mutex<Vec<TicketComment>>,
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: NewTicket) -> Result<EmergencyTicket> {
        let record = EmergencyTicket {
            id: TicketId::new(),
            community_id: ticket.community_id,
            author_id: ticket.author_id,
            ticket_type: ticket.ticket_type,
            title: ticket.title,
            description: ticket.description,
            status: Default::default(),
            urgency: ticket.urgency,
            assigned_to: None,
            due_at: ticket.due_at,
            created_at: ticket.created_at,
            updated_at: ticket.created_at,
        };
        self.tickets.lock().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(
        &self,
        community_id: CommunityId,
        ticket_id: TicketId,
    ) -> Result<Option<EmergencyTicket>> {
        Ok(self
            .tickets
            .lock()
            .await
            .get(&ticket_id)
            .filter(|ticket| ticket.community_id == community_id)
            .cloned())
    }

    async fn list(
        &self,
        community_id: CommunityId,
        filter: &TicketFilter,
    ) -> Result<Vec<EmergencyTicket>> {
        let mut tickets: Vec<EmergencyTicket> = self
            .tickets
            .lock()
            .await
            .values()
            .filter(|ticket| ticket.community_id == community_id && filter.matches(ticket))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(tickets)
    }

    async fn update(
        &self,
        ticket_id: TicketId,
        expected: TicketPrecondition,
        changes: TicketChanges,
        now: DateTime<Utc>,
    ) -> Result<EmergencyTicket> {
        let mut tickets = self.tickets.lock().await;
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| CoreError::not_found(format!("ticket {ticket_id}")))?;
        expected.verify(ticket)?;
        changes.apply_to(ticket, now);
        Ok(ticket.clone())
    }

    async fn add_comment(&self, comment: NewComment) -> Result<TicketComment> {
        let record = TicketComment {
            id: CommentId::new(),
            ticket_id: comment.ticket_id,
            author_id: comment.author_id,
            body: comment.body,
            created_at: comment.created_at,
        };
        self.comments.lock().await.push(record.clone());
        Ok(record)
    }

    async fn comments(&self, ticket_id: TicketId) -> Result<Vec<TicketComment>> {
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| comment.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryInstanceRepository {
    instances: Mutex<Vec<KnownInstance>>,
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn upsert_seen(
        &self,
        instance_url: &str,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<KnownInstance> {
        let mut instances = self.instances.lock().await;
        let position = instances
            .iter()
            .position(|instance| instance.instance_url == instance_url);
        let (id, created_at) = match position {
            Some(index) => (instances[index].id, instances[index].created_at),
            None => (InstanceId::new(), seen_at),
        };
        let record = KnownInstance {
            id,
            instance_url: instance_url.to_string(),
            name: info.name.clone(),
            description: info.description.clone(),
            region: info.region.clone(),
            version: info.version.clone(),
            platform_mode: info.platform_mode,
            community_count: info.community_count,
            user_count: info.user_count,
            is_reachable: true,
            last_seen_at: seen_at,
            created_at,
        };
        match position {
            Some(index) => instances[index] = record.clone(),
            None => instances.push(record.clone()),
        }
        Ok(record)
    }

    async fn record_seen(
        &self,
        id: InstanceId,
        info: &InstanceInfo,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<KnownInstance>> {
        let mut instances = self.instances.lock().await;
        let Some(instance) = instances.iter_mut().find(|instance| instance.id == id) else {
            return Ok(None);
        };
        instance.name = info.name.clone();
        instance.description = info.description.clone();
        instance.region = info.region.clone();
        instance.version = info.version.clone();
        instance.platform_mode = info.platform_mode;
        instance.community_count = info.community_count;
        instance.user_count = info.user_count;
        instance.is_reachable = true;
        instance.last_seen_at = seen_at;
        Ok(Some(instance.clone()))
    }

    async fn mark_unreachable(&self, id: InstanceId) -> Result<()> {
        if let Some(instance) = self
            .instances
            .lock()
            .await
            .iter_mut()
            .find(|instance| instance.id == id)
        {
            instance.is_reachable = false;
        }
        Ok(())
    }

    async fn list(&self, reachable_only: bool) -> Result<Vec<KnownInstance>> {
        let mut instances: Vec<KnownInstance> = self
            .instances
            .lock()
            .await
            .iter()
            .filter(|instance| !reachable_only || instance.is_reachable)
            .cloned()
            .collect();
        instances.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(instances)
    }

    async fn find(&self, id: InstanceId) -> Result<Option<KnownInstance>> {
        Ok(self
            .instances
            .lock()
            .await
            .iter()
            .find(|instance| instance.id == id)
            .cloned())
    }

    async fn delete(&self, id: InstanceId) -> Result<bool> {
        let mut instances = self.instances.lock().await;
        let before = instances.len();
        instances.retain(|instance| instance.id != id);
        Ok(instances.len() != before)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAlertRepository {
    alerts: Mutex<Vec<RedSkyAlert>>,
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn insert(&self, alert: NewAlert) -> Result<RedSkyAlert> {
        let record = RedSkyAlert {
            id: AlertId::new(),
            source_instance_url: alert.source_instance_url,
            source_instance_name: alert.source_instance_name,
            title: alert.title,
            body: alert.body,
            severity: alert.severity,
            origin: alert.origin,
            expires_at: alert.expires_at,
            dismissed: false,
            created_at: alert.created_at,
        };
        self.alerts.lock().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self, active_only: bool, now: DateTime<Utc>) -> Result<Vec<RedSkyAlert>> {
        let mut alerts: Vec<RedSkyAlert> = self
            .alerts
            .lock()
            .await
            .iter()
            .filter(|alert| !active_only || alert.is_active(now))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn dismiss(&self, id: AlertId) -> Result<Option<RedSkyAlert>> {
        let mut alerts = self.alerts.lock().await;
        Ok(alerts.iter_mut().find(|alert| alert.id == id).map(|alert| {
            alert.dismissed = true;
            alert.clone()
        }))
    }
}

/// All in-memory adapters wired together, with seeding helpers.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pub crisis: Arc<InMemoryCrisisRepository>,
    pub membership: Arc<InMemoryMembershipDirectory>,
    pub tickets: Arc<InMemoryTicketRepository>,
    pub instances: Arc<InMemoryInstanceRepository>,
    pub alerts: Arc<InMemoryAlertRepository>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Blue Sky community with the given members.
    pub fn seed_community(&self, members: &[(MemberId, CommunityRole)]) -> CommunityId {
        let community_id = CommunityId::new();
        self.crisis.insert_community(community_id);
        for (member_id, role) in members {
            self.membership.add_member(community_id, *member_id, *role);
        }
        community_id
    }

    pub fn unit_of_work(&self) -> AppUnitOfWork {
        AppUnitOfWork {
            crisis: self.crisis.clone(),
            membership: self.membership.clone(),
            tickets: self.tickets.clone(),
            instances: self.instances.clone(),
            alerts: self.alerts.clone(),
        }
    }
}
