//! In-memory marketplace store for tests
//!
//! Mirrors the PostgreSQL semantics closely enough for the API test suite:
//! unique constraints become `Duplicate`, conditional updates become state
//! checks, and each call runs under one lock so compound effects are atomic.
//! Validation inside a call always happens before the first mutation.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solveby_types::{
    BalanceReason, JobStatus, Participants, Proficiency, ProposalStatus, RequestStatus,
    SearchSort, SessionStatus, COMPLETION_KARMA, DELIVERY_MESSAGE_PREFIX,
};
use uuid::Uuid;

use crate::ledger::check_direction;
use crate::models::*;
use crate::params::*;
use crate::store::*;
use crate::{DbError, DbResult};

#[derive(Default)]
struct MockState {
    agents: Vec<DbAgent>,
    services: Vec<DbService>,
    packages: Vec<DbPackage>,
    addons: Vec<DbAddon>,
    requests: Vec<DbRequest>,
    proposals: Vec<DbProposal>,
    jobs: Vec<DbJob>,
    messages: Vec<DbMessage>,
    reviews: Vec<DbReview>,
    tips: Vec<DbTip>,
    transactions: Vec<DbTransaction>,
    wallets: Vec<DbWallet>,
    notifications: Vec<DbNotification>,
    skills: Vec<DbSkill>,
    agent_skills: Vec<(Uuid, Uuid, Proficiency, chrono::DateTime<Utc>)>,
    portfolio: Vec<DbPortfolioItem>,
    sessions: Vec<DbCompanionSession>,
}

/// Thread-safe in-memory implementation of [`MarketStore`]
pub struct MockDatabase {
    state: Mutex<MockState>,
}

impl Default for MockDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDatabase {
    /// Empty store with the default skill catalog
    pub fn new() -> Self {
        let skills = [
            ("Rust", "programming"),
            ("Python", "programming"),
            ("TypeScript", "programming"),
            ("SQL", "data"),
            ("Data Analysis", "data"),
            ("Machine Learning", "data"),
            ("Copywriting", "writing"),
            ("Technical Writing", "writing"),
            ("Translation", "writing"),
            ("UI Design", "design"),
            ("Research", "research"),
            ("Smart Contracts", "blockchain"),
        ]
        .into_iter()
        .map(|(name, category)| DbSkill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            description: None,
        })
        .collect();

        Self {
            state: Mutex::new(MockState {
                skills,
                ..Default::default()
            }),
        }
    }

    /// Audit rows for one agent, oldest first
    pub fn transactions_of(&self, agent_id: Uuid) -> Vec<DbTransaction> {
        let state = self.state.lock();
        state
            .transactions
            .iter()
            .filter(|t| t.agent_id == agent_id)
            .cloned()
            .collect()
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: solveby_types::Page) -> Vec<T> {
    items
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn text_matches(fields: &[Option<&str>], text: &Option<String>) -> bool {
    match text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        None => true,
        Some(needle) => fields.iter().flatten().any(|f| contains_ci(f, needle)),
    }
}

impl MockState {
    fn agent(&self, id: Uuid) -> DbResult<&DbAgent> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| DbError::NotFound("Agent not found".to_string()))
    }

    fn agent_mut(&mut self, id: Uuid) -> DbResult<&mut DbAgent> {
        self.agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DbError::NotFound("Agent not found".to_string()))
    }

    fn agent_name(&self, id: Uuid) -> String {
        self.agent(id).map(|a| a.name.clone()).unwrap_or_default()
    }

    /// Same contract as [`crate::ledger::adjust_balance`]
    fn adjust_balance(
        &mut self,
        agent_id: Uuid,
        delta: Decimal,
        reason: BalanceReason,
        reference: Option<(&str, Uuid)>,
        note: Option<&str>,
    ) -> DbResult<DbTransaction> {
        check_direction(delta, reason)?;

        let agent = self.agent_mut(agent_id)?;
        let before = agent.crust_balance;
        let after = before + delta;
        if after < Decimal::ZERO {
            return Err(DbError::InsufficientBalance {
                available: before,
                required: -delta,
            });
        }

        agent.crust_balance = after;
        match reason {
            BalanceReason::RegistrationBonus => {}
            BalanceReason::JobPayment => agent.crust_spent += delta.abs(),
            BalanceReason::JobEarning => agent.crust_earned += delta.abs(),
            BalanceReason::TipSent => agent.tips_given += delta.abs(),
            BalanceReason::TipReceived => agent.tips_received += delta.abs(),
        }
        agent.updated_at = Utc::now();

        let row = DbTransaction {
            id: Uuid::new_v4(),
            agent_id,
            kind: reason,
            amount: delta,
            balance_before: before,
            balance_after: after,
            reference_type: reference.map(|(kind, _)| kind.to_string()),
            reference_id: reference.map(|(_, id)| id),
            note: note.map(str::to_string),
            created_at: Utc::now(),
        };
        self.transactions.push(row.clone());
        Ok(row)
    }

    fn push_notification(&mut self, n: NewNotification) -> DbNotification {
        let row = DbNotification {
            id: Uuid::new_v4(),
            agent_id: n.agent_id,
            kind: n.kind.to_string(),
            subtype: n.subtype.map(str::to_string),
            title: n.title,
            message: n.message,
            data: n.data,
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.push(row.clone());
        row
    }

    fn live_service(&self, id: Uuid) -> Option<&DbService> {
        self.services.iter().find(|s| s.id == id && s.deleted_at.is_none())
    }

    fn service_listing(&self, service: &DbService) -> ServiceListing {
        let provider = self.agent(service.agent_id).ok();
        ServiceListing {
            service: service.clone(),
            provider_name: provider.map(|a| a.name.clone()).unwrap_or_default(),
            provider_karma: provider.map(|a| a.karma).unwrap_or_default(),
        }
    }

    fn request_listing(&self, request: &DbRequest) -> RequestListing {
        RequestListing {
            request: request.clone(),
            requester_name: self.agent_name(request.agent_id),
            proposals_count: self.proposals.iter().filter(|p| p.request_id == request.id).count() as i64,
        }
    }

    fn job_listing(&self, job: &DbJob) -> JobListing {
        JobListing {
            job: job.clone(),
            client_name: self.agent_name(job.client_id),
            provider_name: self.agent_name(job.provider_id),
        }
    }

    fn review_listing(&self, review: &DbReview) -> ReviewListing {
        ReviewListing {
            review: review.clone(),
            reviewer_name: self.agent_name(review.reviewer_id),
        }
    }

    fn job_mut(&mut self, id: Uuid) -> DbResult<&mut DbJob> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| DbError::NotFound("Job not found".to_string()))
    }

    fn skill_listing(&self, skill_id: Uuid, level: Proficiency, created_at: chrono::DateTime<Utc>) -> Option<AgentSkillListing> {
        self.skills.iter().find(|s| s.id == skill_id).map(|s| AgentSkillListing {
            skill_id,
            name: s.name.clone(),
            category: s.category.clone(),
            proficiency_level: level,
            created_at,
        })
    }
}

fn missed_transition(job: &DbJob, expected: JobStatus) -> DbError {
    DbError::InvalidState(format!(
        "Job must be {} (current status: {})",
        expected, job.status
    ))
}

// ============================================================================
// Agents
// ============================================================================

#[async_trait]
impl AgentStore for MockDatabase {
    async fn register_agent(&self, new: NewAgent) -> DbResult<DbAgent> {
        let mut state = self.state.lock();
        if state.agents.iter().any(|a| a.name == new.name) {
            return Err(DbError::Duplicate("Name already taken".to_string()));
        }

        let now = Utc::now();
        let agent = DbAgent {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            avatar_url: None,
            api_key_hash: new.api_key_hash,
            crust_balance: Decimal::ZERO,
            karma: 0,
            crust_earned: Decimal::ZERO,
            crust_spent: Decimal::ZERO,
            tips_received: Decimal::ZERO,
            tips_given: Decimal::ZERO,
            primary_wallet: new.wallet_address.clone(),
            is_companion: false,
            companion_specialty: None,
            companion_available: false,
            created_at: now,
            updated_at: now,
            last_active_at: None,
        };
        let id = agent.id;
        state.agents.push(agent);

        if new.starting_balance > Decimal::ZERO {
            state.adjust_balance(
                id,
                new.starting_balance,
                BalanceReason::RegistrationBonus,
                Some(("agent", id)),
                Some("Welcome bonus"),
            )?;
        }

        if let Some(address) = new.wallet_address {
            state.wallets.push(DbWallet {
                id: Uuid::new_v4(),
                agent_id: id,
                wallet_address: address,
                chain: solveby_types::Chain::Solana,
                is_primary: true,
                verified: false,
                created_at: now,
            });
        }

        Ok(state.agent(id)?.clone())
    }

    async fn find_agent(&self, id: Uuid) -> DbResult<Option<DbAgent>> {
        Ok(self.state.lock().agents.iter().find(|a| a.id == id).cloned())
    }

    async fn find_agent_by_name(&self, name: &str) -> DbResult<Option<DbAgent>> {
        Ok(self.state.lock().agents.iter().find(|a| a.name == name).cloned())
    }

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> DbResult<Option<DbAgent>> {
        Ok(self
            .state
            .lock()
            .agents
            .iter()
            .find(|a| a.api_key_hash == key_hash)
            .cloned())
    }

    async fn touch_agent(&self, id: Uuid) -> DbResult<()> {
        if let Ok(agent) = self.state.lock().agent_mut(id) {
            agent.last_active_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_agent(&self, id: Uuid, update: AgentUpdate) -> DbResult<DbAgent> {
        let mut state = self.state.lock();
        let agent = state.agent_mut(id)?;
        if let Some(description) = update.description {
            agent.description = Some(description);
        }
        if let Some(avatar_url) = update.avatar_url {
            agent.avatar_url = Some(avatar_url);
        }
        if let Some(is_companion) = update.is_companion {
            agent.is_companion = is_companion;
        }
        if let Some(specialty) = update.companion_specialty {
            agent.companion_specialty = Some(specialty);
        }
        if let Some(available) = update.companion_available {
            agent.companion_available = available;
        }
        agent.updated_at = Utc::now();
        Ok(agent.clone())
    }

    async fn agent_activity(&self, id: Uuid) -> DbResult<AgentActivity> {
        let state = self.state.lock();
        let live_services = || state.services.iter().filter(|s| s.agent_id == id && s.deleted_at.is_none());
        let count_jobs = |f: &dyn Fn(&DbJob) -> bool| state.jobs.iter().filter(|j| f(j)).count() as i64;

        let mut rating_distribution = [0i64; 5];
        for review in state.reviews.iter().filter(|r| r.reviewee_id == id) {
            if (1..=5).contains(&review.rating) {
                rating_distribution[(review.rating - 1) as usize] += 1;
            }
        }

        Ok(AgentActivity {
            services_count: live_services().count() as i64,
            active_services: live_services().filter(|s| s.active).count() as i64,
            requests_count: state.requests.iter().filter(|r| r.agent_id == id).count() as i64,
            jobs_as_client: count_jobs(&|j| j.client_id == id),
            jobs_as_provider: count_jobs(&|j| j.provider_id == id),
            completed_as_client: count_jobs(&|j| j.client_id == id && j.status == JobStatus::Completed),
            completed_as_provider: count_jobs(&|j| j.provider_id == id && j.status == JobStatus::Completed),
            rating_distribution,
        })
    }

    async fn leaderboard(&self, limit: i64) -> DbResult<Vec<DbAgent>> {
        let state = self.state.lock();
        let mut agents = state.agents.clone();
        agents.sort_by_key(|a| (Reverse(a.karma), a.created_at));
        agents.truncate(limit.max(0) as usize);
        Ok(agents)
    }

    async fn karma_rank(&self, id: Uuid) -> DbResult<i64> {
        let state = self.state.lock();
        let karma = state.agent(id)?.karma;
        Ok(state.agents.iter().filter(|a| a.karma > karma).count() as i64 + 1)
    }

    async fn list_companions(&self, filter: CompanionFilter) -> DbResult<Vec<DbAgent>> {
        let state = self.state.lock();
        let mut companions: Vec<DbAgent> = state
            .agents
            .iter()
            .filter(|a| a.is_companion)
            .filter(|a| filter.available.map_or(true, |v| a.companion_available == v))
            .filter(|a| {
                filter
                    .specialty
                    .as_ref()
                    .map_or(true, |s| a.companion_specialty.as_ref() == Some(s))
            })
            .cloned()
            .collect();
        companions.sort_by_key(|a| Reverse(a.karma));
        Ok(page(companions.into_iter(), filter.page))
    }
}

// ============================================================================
// Listings
// ============================================================================

#[async_trait]
impl ListingStore for MockDatabase {
    async fn create_service(&self, new: NewService) -> DbResult<DbService> {
        let now = Utc::now();
        let service = DbService {
            id: Uuid::new_v4(),
            agent_id: new.agent_id,
            title: new.title,
            description: new.description,
            category: new.category.as_str().to_string(),
            price: new.price,
            active: true,
            orders_count: 0,
            avg_rating: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.state.lock().services.push(service.clone());
        Ok(service)
    }

    async fn find_service(&self, id: Uuid) -> DbResult<Option<DbService>> {
        Ok(self.state.lock().live_service(id).cloned())
    }

    async fn list_services(&self, filter: ServiceFilter) -> DbResult<Vec<ServiceListing>> {
        let state = self.state.lock();
        let mut services: Vec<&DbService> = state
            .services
            .iter()
            .filter(|s| s.active && s.deleted_at.is_none())
            .filter(|s| filter.category.as_ref().map_or(true, |c| s.category == c.as_str()))
            .filter(|s| filter.agent_id.map_or(true, |id| s.agent_id == id))
            .collect();
        services.sort_by_key(|s| Reverse(s.created_at));
        Ok(page(services.into_iter().map(|s| state.service_listing(s)), filter.page))
    }

    async fn update_service(&self, id: Uuid, update: ServiceUpdate) -> DbResult<DbService> {
        let mut state = self.state.lock();
        let service = state
            .services
            .iter_mut()
            .find(|s| s.id == id && s.deleted_at.is_none())
            .ok_or_else(|| DbError::NotFound("Service not found".to_string()))?;

        if let Some(title) = update.title {
            service.title = title;
        }
        if let Some(description) = update.description {
            service.description = description;
        }
        if let Some(category) = update.category {
            service.category = category.as_str().to_string();
        }
        if let Some(price) = update.price {
            service.price = price;
        }
        if let Some(active) = update.active {
            service.active = active;
        }
        service.updated_at = Utc::now();
        Ok(service.clone())
    }

    async fn delete_service(&self, id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock();
        let service = state
            .services
            .iter_mut()
            .find(|s| s.id == id && s.deleted_at.is_none())
            .ok_or_else(|| DbError::NotFound("Service not found".to_string()))?;
        service.deleted_at = Some(Utc::now());
        service.active = false;
        Ok(())
    }

    async fn list_packages(&self, service_id: Uuid) -> DbResult<Vec<DbPackage>> {
        let state = self.state.lock();
        let mut packages: Vec<DbPackage> = state
            .packages
            .iter()
            .filter(|p| p.service_id == service_id)
            .cloned()
            .collect();
        packages.sort_by_key(|p| p.price);
        Ok(packages)
    }

    async fn create_package(&self, new: NewPackage) -> DbResult<DbPackage> {
        let mut state = self.state.lock();
        if state
            .packages
            .iter()
            .any(|p| p.service_id == new.service_id && p.tier == new.tier)
        {
            return Err(DbError::Duplicate("A package for this tier already exists".to_string()));
        }

        let package = DbPackage {
            id: Uuid::new_v4(),
            service_id: new.service_id,
            tier: new.tier,
            name: new.name,
            description: new.description,
            price: new.price,
            delivery_days: new.delivery_days,
            revisions: new.revisions,
            features: new.features,
            created_at: Utc::now(),
        };
        state.packages.push(package.clone());
        Ok(package)
    }

    async fn find_package(&self, id: Uuid) -> DbResult<Option<DbPackage>> {
        Ok(self.state.lock().packages.iter().find(|p| p.id == id).cloned())
    }

    async fn list_addons(&self, service_id: Uuid) -> DbResult<Vec<DbAddon>> {
        let state = self.state.lock();
        let mut addons: Vec<DbAddon> = state
            .addons
            .iter()
            .filter(|a| a.service_id == service_id && a.is_active)
            .cloned()
            .collect();
        addons.sort_by_key(|a| a.price);
        Ok(addons)
    }

    async fn create_addon(&self, new: NewAddon) -> DbResult<DbAddon> {
        let addon = DbAddon {
            id: Uuid::new_v4(),
            service_id: new.service_id,
            name: new.name,
            description: new.description,
            price: new.price,
            delivery_days_extra: new.delivery_days_extra,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.lock().addons.push(addon.clone());
        Ok(addon)
    }

    async fn find_addons(&self, service_id: Uuid, ids: &[Uuid]) -> DbResult<Vec<DbAddon>> {
        let state = self.state.lock();
        Ok(state
            .addons
            .iter()
            .filter(|a| a.service_id == service_id && a.is_active && ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn create_request(&self, new: NewRequest) -> DbResult<DbRequest> {
        let now = Utc::now();
        let request = DbRequest {
            id: Uuid::new_v4(),
            agent_id: new.agent_id,
            title: new.title,
            description: new.description,
            category: new.category.as_str().to_string(),
            budget: new.budget,
            urgency: new.urgency,
            status: RequestStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().requests.push(request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> DbResult<Option<DbRequest>> {
        Ok(self.state.lock().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(&self, filter: RequestFilter) -> DbResult<Vec<RequestListing>> {
        let state = self.state.lock();
        let mut requests: Vec<&DbRequest> = state
            .requests
            .iter()
            .filter(|r| r.status == filter.status)
            .filter(|r| filter.category.as_ref().map_or(true, |c| r.category == c.as_str()))
            .filter(|r| filter.urgency.map_or(true, |u| r.urgency == u))
            .collect();
        requests.sort_by_key(|r| Reverse(r.created_at));
        Ok(page(requests.into_iter().map(|r| state.request_listing(r)), filter.page))
    }

    async fn cancel_request(&self, id: Uuid) -> DbResult<DbRequest> {
        let mut state = self.state.lock();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DbError::NotFound("Request not found".to_string()))?;
        if !request.status.is_open() {
            return Err(DbError::InvalidState("Only open requests can be cancelled".to_string()));
        }
        request.status = RequestStatus::Cancelled;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }
}

// ============================================================================
// Proposals
// ============================================================================

#[async_trait]
impl ProposalStore for MockDatabase {
    async fn submit_proposal(&self, new: NewProposal) -> DbResult<DbProposal> {
        let mut state = self.state.lock();
        let request = state
            .requests
            .iter()
            .find(|r| r.id == new.request_id)
            .ok_or_else(|| DbError::NotFound("Request not found".to_string()))?;
        if !request.status.is_open() {
            return Err(DbError::InvalidState(
                "This request is no longer accepting proposals".to_string(),
            ));
        }
        if state
            .proposals
            .iter()
            .any(|p| p.request_id == new.request_id && p.agent_id == new.agent_id)
        {
            return Err(DbError::Duplicate(
                "You have already submitted a proposal for this request".to_string(),
            ));
        }

        let now = Utc::now();
        let proposal = DbProposal {
            id: Uuid::new_v4(),
            request_id: new.request_id,
            agent_id: new.agent_id,
            price: new.price,
            message: new.message,
            estimated_days: new.estimated_days,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn list_proposals(&self, request_id: Uuid) -> DbResult<Vec<ProposalListing>> {
        let state = self.state.lock();
        Ok(state
            .proposals
            .iter()
            .filter(|p| p.request_id == request_id)
            .map(|p| {
                let agent = state.agent(p.agent_id).ok();
                ProposalListing {
                    proposal: p.clone(),
                    agent_name: agent.map(|a| a.name.clone()).unwrap_or_default(),
                    agent_karma: agent.map(|a| a.karma).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn find_proposal(&self, id: Uuid) -> DbResult<Option<DbProposal>> {
        Ok(self.state.lock().proposals.iter().find(|p| p.id == id).cloned())
    }

    async fn find_agent_proposal(&self, request_id: Uuid, agent_id: Uuid) -> DbResult<Option<DbProposal>> {
        Ok(self
            .state
            .lock()
            .proposals
            .iter()
            .find(|p| p.request_id == request_id && p.agent_id == agent_id)
            .cloned())
    }
}

// ============================================================================
// Jobs
// ============================================================================

#[async_trait]
impl JobStore for MockDatabase {
    async fn accept_proposal(&self, accept: AcceptProposal) -> DbResult<DbJob> {
        let mut state = self.state.lock();
        let proposal = state
            .proposals
            .iter()
            .find(|p| p.id == accept.proposal_id)
            .cloned()
            .ok_or_else(|| DbError::NotFound("Proposal not found".to_string()))?;
        let request = state
            .requests
            .iter()
            .find(|r| r.id == proposal.request_id)
            .cloned()
            .ok_or_else(|| DbError::NotFound("Request not found".to_string()))?;

        if request.agent_id != accept.client_id {
            return Err(DbError::Forbidden(
                "You can only accept proposals on your own requests".to_string(),
            ));
        }
        if !request.status.is_open() {
            return Err(DbError::InvalidState("This request is no longer open".to_string()));
        }
        if proposal.status != ProposalStatus::Pending {
            return Err(DbError::InvalidState("This proposal is no longer pending".to_string()));
        }

        let job_id = Uuid::new_v4();
        state.adjust_balance(
            accept.client_id,
            -proposal.price,
            BalanceReason::JobPayment,
            Some(("job", job_id)),
            Some(request.title.as_str()),
        )?;

        let now = Utc::now();
        let job = DbJob {
            id: job_id,
            request_id: Some(request.id),
            proposal_id: Some(proposal.id),
            service_id: None,
            client_id: accept.client_id,
            provider_id: proposal.agent_id,
            title: request.title.clone(),
            price: proposal.price,
            status: JobStatus::InProgress,
            package_tier: None,
            addons: serde_json::json!([]),
            requirements: None,
            max_revisions: solveby_types::DEFAULT_REVISIONS,
            deadline: proposal
                .estimated_days
                .and_then(|d| Duration::try_days(i64::from(d)))
                .and_then(|d| now.checked_add_signed(d)),
            started_at: now,
            delivered_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());

        for p in state.proposals.iter_mut().filter(|p| p.request_id == request.id) {
            if p.id == proposal.id {
                p.status = ProposalStatus::Accepted;
                p.updated_at = now;
            } else if p.status == ProposalStatus::Pending {
                p.status = ProposalStatus::Rejected;
                p.updated_at = now;
            }
        }
        if let Some(r) = state.requests.iter_mut().find(|r| r.id == request.id) {
            r.status = RequestStatus::InProgress;
            r.updated_at = now;
        }

        state.push_notification(NewNotification::proposal_accepted(&job, &accept.client_name));
        Ok(job)
    }

    async fn hire_service(&self, hire: NewHire) -> DbResult<DbJob> {
        let mut state = self.state.lock();
        let service = state
            .live_service(hire.service_id)
            .ok_or_else(|| DbError::NotFound("Service not found".to_string()))?;
        if !service.active {
            return Err(DbError::InvalidState(
                "This service is not currently available".to_string(),
            ));
        }

        let job_id = Uuid::new_v4();
        state.adjust_balance(
            hire.client_id,
            -hire.quote.price,
            BalanceReason::JobPayment,
            Some(("job", job_id)),
            Some(hire.title.as_str()),
        )?;

        let now = Utc::now();
        let job = DbJob {
            id: job_id,
            request_id: None,
            proposal_id: None,
            service_id: Some(hire.service_id),
            client_id: hire.client_id,
            provider_id: hire.provider_id,
            title: hire.title,
            price: hire.quote.price,
            status: JobStatus::InProgress,
            package_tier: hire.quote.tier.map(|t| t.as_str().to_string()),
            addons: hire.addons,
            requirements: hire.requirements,
            max_revisions: hire.quote.revisions,
            deadline: Some(hire.deadline),
            started_at: now,
            delivered_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());

        if let Some(s) = state.services.iter_mut().find(|s| s.id == hire.service_id) {
            s.orders_count += 1;
        }

        state.push_notification(NewNotification::order_received(&job, &hire.client_name));
        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> DbResult<Option<DbJob>> {
        Ok(self.state.lock().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self, filter: JobFilter) -> DbResult<Vec<JobListing>> {
        let state = self.state.lock();
        let mut jobs: Vec<&DbJob> = state
            .jobs
            .iter()
            .filter(|j| match (filter.role, j.role_of(filter.agent_id)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(wanted), Some(actual)) => wanted == actual,
            })
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .collect();
        jobs.sort_by_key(|j| Reverse(j.created_at));
        Ok(page(jobs.into_iter().map(|j| state.job_listing(j)), filter.page))
    }

    async fn deliver_job(&self, id: Uuid, message: Option<String>) -> DbResult<DbJob> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let job = state.job_mut(id)?;
        if job.status != JobStatus::InProgress {
            return Err(missed_transition(job, JobStatus::InProgress));
        }
        job.status = JobStatus::Delivered;
        job.delivered_at = Some(now);
        job.updated_at = now;
        let job = job.clone();

        if let Some(note) = message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            state.messages.push(DbMessage {
                id: Uuid::new_v4(),
                job_id: job.id,
                sender_id: job.provider_id,
                content: format!("{}{}", DELIVERY_MESSAGE_PREFIX, note),
                created_at: now,
            });
        }

        state.push_notification(NewNotification::job_delivered(&job));
        Ok(job)
    }

    async fn complete_job(&self, id: Uuid) -> DbResult<DbJob> {
        let mut state = self.state.lock();
        let job = state.job_mut(id)?;
        if job.status != JobStatus::Delivered {
            return Err(missed_transition(job, JobStatus::Delivered));
        }
        let (provider_id, price, title) = (job.provider_id, job.price, job.title.clone());

        state.adjust_balance(
            provider_id,
            price,
            BalanceReason::JobEarning,
            Some(("job", id)),
            Some(title.as_str()),
        )?;

        let now = Utc::now();
        let job = state.job_mut(id)?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(now);
        job.updated_at = now;
        let job = job.clone();

        state.agent_mut(provider_id)?.karma += COMPLETION_KARMA;

        if let Some(request_id) = job.request_id {
            if let Some(r) = state
                .requests
                .iter_mut()
                .find(|r| r.id == request_id && r.status == RequestStatus::InProgress)
            {
                r.status = RequestStatus::Completed;
                r.updated_at = now;
            }
        }

        state.push_notification(NewNotification::job_completed(&job));
        Ok(job)
    }

    async fn post_message(&self, job_id: Uuid, sender_id: Uuid, content: String) -> DbResult<DbMessage> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id)?;
        if job.status.is_closed() {
            return Err(DbError::InvalidState("Cannot send messages to a closed job".to_string()));
        }

        let message = DbMessage {
            id: Uuid::new_v4(),
            job_id,
            sender_id,
            content,
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, job_id: Uuid) -> DbResult<Vec<MessageListing>> {
        let state = self.state.lock();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.job_id == job_id)
            .map(|m| MessageListing {
                message: m.clone(),
                sender_name: state.agent_name(m.sender_id),
            })
            .collect())
    }

    async fn submit_review(&self, new: NewReview) -> DbResult<DbReview> {
        let mut state = self.state.lock();
        let job = state.job_mut(new.job_id)?.clone();
        if job.status != JobStatus::Completed {
            return Err(DbError::InvalidState("You can only review completed jobs".to_string()));
        }
        if state
            .reviews
            .iter()
            .any(|r| r.job_id == new.job_id && r.reviewer_id == new.reviewer_id)
        {
            return Err(DbError::Duplicate("You have already reviewed this job".to_string()));
        }
        // Fail on an unknown reviewee before anything is written
        state.agent(new.reviewee_id)?;

        let review = DbReview {
            id: Uuid::new_v4(),
            job_id: new.job_id,
            reviewer_id: new.reviewer_id,
            reviewee_id: new.reviewee_id,
            rating: new.rating.value(),
            content: new.content,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        state.agent_mut(new.reviewee_id)?.karma += new.rating.karma_delta();

        if let Some(service_id) = job.service_id.filter(|_| new.reviewee_id == job.provider_id) {
            let ratings: Vec<i64> = state
                .reviews
                .iter()
                .filter(|r| {
                    state.jobs.iter().any(|j| {
                        j.id == r.job_id && j.service_id == Some(service_id) && r.reviewee_id == j.provider_id
                    })
                })
                .map(|r| r.rating as i64)
                .collect();
            let avg = Decimal::from(ratings.iter().sum::<i64>()) / Decimal::from(ratings.len().max(1) as i64);
            if let Some(s) = state.services.iter_mut().find(|s| s.id == service_id) {
                s.avg_rating = Some(avg.round_dp(2));
            }
        }

        Ok(review)
    }

    async fn list_job_reviews(&self, job_id: Uuid) -> DbResult<Vec<ReviewListing>> {
        let state = self.state.lock();
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.job_id == job_id)
            .map(|r| state.review_listing(r))
            .collect())
    }

    async fn list_agent_reviews(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<ReviewListing>> {
        let state = self.state.lock();
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.reviewee_id == agent_id)
            .take(limit.max(0) as usize)
            .map(|r| state.review_listing(r))
            .collect())
    }
}

// ============================================================================
// Ledger, wallets, notifications
// ============================================================================

#[async_trait]
impl LedgerStore for MockDatabase {
    async fn send_tip(&self, tip: NewTip) -> DbResult<TipReceipt> {
        let mut state = self.state.lock();
        state.agent(tip.to_agent_id)?;
        let sender = state.agent(tip.from_agent_id)?;
        if sender.crust_balance < tip.amount {
            return Err(DbError::InsufficientBalance {
                available: sender.crust_balance,
                required: tip.amount,
            });
        }

        let row = DbTip {
            id: Uuid::new_v4(),
            from_agent_id: tip.from_agent_id,
            to_agent_id: tip.to_agent_id,
            amount: tip.amount,
            message: tip.message.clone(),
            job_id: tip.job_id,
            status: "confirmed".to_string(),
            created_at: Utc::now(),
        };

        let debit = state.adjust_balance(
            tip.from_agent_id,
            -tip.amount,
            BalanceReason::TipSent,
            Some(("tip", row.id)),
            tip.message.as_deref(),
        )?;
        state.adjust_balance(
            tip.to_agent_id,
            tip.amount,
            BalanceReason::TipReceived,
            Some(("tip", row.id)),
            tip.message.as_deref(),
        )?;
        state.tips.push(row.clone());
        state.push_notification(NewNotification::tip_received(
            tip.to_agent_id,
            &tip.from_agent_name,
            tip.amount,
            row.id,
        ));

        Ok(TipReceipt {
            tip: row,
            sender_balance: debit.balance_after,
        })
    }

    async fn list_tips(&self, agent_id: Uuid, direction: TipDirection, limit: i64) -> DbResult<Vec<TipListing>> {
        let state = self.state.lock();
        Ok(state
            .tips
            .iter()
            .rev()
            .filter(|t| match direction {
                TipDirection::Received => t.to_agent_id == agent_id,
                TipDirection::Given => t.from_agent_id == agent_id,
            })
            .take(limit.max(0) as usize)
            .map(|t| TipListing {
                tip: t.clone(),
                from_agent_name: state.agent_name(t.from_agent_id),
                to_agent_name: state.agent_name(t.to_agent_id),
            })
            .collect())
    }

    async fn list_transactions(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbTransaction>> {
        let state = self.state.lock();
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.agent_id == agent_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn escrow_total(&self, agent_id: Uuid) -> DbResult<Decimal> {
        let state = self.state.lock();
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.client_id == agent_id && j.status.holds_funds())
            .map(|j| j.price)
            .sum())
    }
}

#[async_trait]
impl WalletStore for MockDatabase {
    async fn list_wallets(&self, agent_id: Uuid) -> DbResult<Vec<DbWallet>> {
        let state = self.state.lock();
        let mut wallets: Vec<DbWallet> = state
            .wallets
            .iter()
            .filter(|w| w.agent_id == agent_id)
            .cloned()
            .collect();
        wallets.sort_by_key(|w| (Reverse(w.is_primary), w.created_at));
        Ok(wallets)
    }

    async fn connect_wallet(&self, new: NewWallet) -> DbResult<DbWallet> {
        let mut state = self.state.lock();
        if state
            .wallets
            .iter()
            .any(|w| w.agent_id == new.agent_id && w.wallet_address == new.wallet_address)
        {
            return Err(DbError::Duplicate("This wallet is already connected".to_string()));
        }

        let primary = new.set_primary || !state.wallets.iter().any(|w| w.agent_id == new.agent_id);
        if primary {
            for w in state.wallets.iter_mut().filter(|w| w.agent_id == new.agent_id) {
                w.is_primary = false;
            }
            state.agent_mut(new.agent_id)?.primary_wallet = Some(new.wallet_address.clone());
        }

        let wallet = DbWallet {
            id: Uuid::new_v4(),
            agent_id: new.agent_id,
            wallet_address: new.wallet_address,
            chain: new.chain,
            is_primary: primary,
            verified: false,
            created_at: Utc::now(),
        };
        state.wallets.push(wallet.clone());
        Ok(wallet)
    }

    async fn disconnect_wallet(&self, agent_id: Uuid, wallet_id: Uuid) -> DbResult<()> {
        let mut state = self.state.lock();
        let index = state
            .wallets
            .iter()
            .position(|w| w.id == wallet_id && w.agent_id == agent_id)
            .ok_or_else(|| DbError::NotFound("Wallet not found".to_string()))?;
        let wallet = state.wallets.remove(index);
        if wallet.is_primary {
            state.agent_mut(agent_id)?.primary_wallet = None;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MockDatabase {
    async fn notify(&self, notification: NewNotification) -> DbResult<DbNotification> {
        Ok(self.state.lock().push_notification(notification))
    }

    async fn list_notifications(&self, filter: NotificationFilter) -> DbResult<NotificationPage> {
        let state = self.state.lock();
        let mine: Vec<&DbNotification> = state
            .notifications
            .iter()
            .filter(|n| n.agent_id == filter.agent_id)
            .collect();

        let items = page(
            mine.iter()
                .rev()
                .filter(|n| !filter.unread_only || !n.is_read)
                .filter(|n| filter.kind.as_ref().map_or(true, |k| &n.kind == k))
                .map(|n| (*n).clone()),
            filter.page,
        );

        Ok(NotificationPage {
            items,
            total: mine.len() as i64,
            unread: mine.iter().filter(|n| !n.is_read).count() as i64,
        })
    }

    async fn mark_notifications(&self, agent_id: Uuid, mark: MarkRead) -> DbResult<u64> {
        let mut state = self.state.lock();
        let mut flipped = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.agent_id == agent_id && !n.is_read)
        {
            let selected = match &mark {
                MarkRead::All => true,
                MarkRead::Ids(ids) => ids.contains(&n.id),
            };
            if selected {
                n.is_read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

// ============================================================================
// Directory and companions
// ============================================================================

#[async_trait]
impl DirectoryStore for MockDatabase {
    async fn search_services(&self, params: &SearchParams) -> DbResult<Vec<ServiceListing>> {
        let state = self.state.lock();
        let mut services: Vec<&DbService> = state
            .services
            .iter()
            .filter(|s| s.active && s.deleted_at.is_none())
            .filter(|s| {
                text_matches(
                    &[Some(s.title.as_str()), Some(s.description.as_str()), Some(s.category.as_str())],
                    &params.text,
                )
            })
            .filter(|s| params.category.as_ref().map_or(true, |c| s.category == c.as_str()))
            .filter(|s| params.min_price.map_or(true, |m| s.price >= m))
            .filter(|s| params.max_price.map_or(true, |m| s.price <= m))
            .filter(|s| params.min_rating.map_or(true, |m| s.avg_rating.map_or(false, |r| r >= m)))
            .collect();

        match params.sort {
            SearchSort::Relevance => services.sort_by_key(|s| (Reverse(s.orders_count), Reverse(s.created_at))),
            SearchSort::Newest => services.sort_by_key(|s| Reverse(s.created_at)),
            SearchSort::PriceLow => services.sort_by_key(|s| s.price),
            SearchSort::PriceHigh => services.sort_by_key(|s| Reverse(s.price)),
            SearchSort::Rating => services.sort_by_key(|s| Reverse(s.avg_rating)),
        }

        Ok(page(services.into_iter().map(|s| state.service_listing(s)), params.page))
    }

    async fn search_requests(&self, params: &SearchParams) -> DbResult<Vec<RequestListing>> {
        let state = self.state.lock();
        let mut requests: Vec<&DbRequest> = state
            .requests
            .iter()
            .filter(|r| r.status.is_open())
            .filter(|r| {
                text_matches(
                    &[Some(r.title.as_str()), Some(r.description.as_str()), Some(r.category.as_str())],
                    &params.text,
                )
            })
            .filter(|r| params.category.as_ref().map_or(true, |c| r.category == c.as_str()))
            .filter(|r| params.min_price.map_or(true, |m| r.budget >= m))
            .filter(|r| params.max_price.map_or(true, |m| r.budget <= m))
            .collect();

        match params.sort {
            SearchSort::PriceLow => requests.sort_by_key(|r| r.budget),
            SearchSort::PriceHigh => requests.sort_by_key(|r| Reverse(r.budget)),
            _ => requests.sort_by_key(|r| Reverse(r.created_at)),
        }

        Ok(page(requests.into_iter().map(|r| state.request_listing(r)), params.page))
    }

    async fn search_agents(&self, params: &SearchParams) -> DbResult<Vec<DbAgent>> {
        let state = self.state.lock();
        let mut agents: Vec<&DbAgent> = state
            .agents
            .iter()
            .filter(|a| text_matches(&[Some(a.name.as_str()), a.description.as_deref()], &params.text))
            .collect();

        match params.sort {
            SearchSort::Newest => agents.sort_by_key(|a| Reverse(a.created_at)),
            _ => agents.sort_by_key(|a| (Reverse(a.karma), a.created_at)),
        }

        Ok(page(agents.into_iter().cloned(), params.page))
    }

    async fn list_categories(&self) -> DbResult<Vec<CategoryCount>> {
        let state = self.state.lock();
        let mut counts: Vec<CategoryCount> = Vec::new();
        let mut bump = |category: &str, service: bool| {
            let entry = match counts.iter_mut().position(|c| c.category == category) {
                Some(i) => &mut counts[i],
                None => {
                    counts.push(CategoryCount {
                        category: category.to_string(),
                        services_count: 0,
                        requests_count: 0,
                    });
                    let last = counts.len() - 1;
                    &mut counts[last]
                }
            };
            if service {
                entry.services_count += 1;
            } else {
                entry.requests_count += 1;
            }
        };

        for s in state.services.iter().filter(|s| s.active && s.deleted_at.is_none()) {
            bump(&s.category, true);
        }
        for r in state.requests.iter().filter(|r| r.status.is_open()) {
            bump(&r.category, false);
        }

        counts.sort_by(|a, b| {
            (b.services_count + b.requests_count)
                .cmp(&(a.services_count + a.requests_count))
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(counts)
    }

    async fn list_skills(&self, category: Option<String>) -> DbResult<Vec<DbSkill>> {
        let state = self.state.lock();
        let mut skills: Vec<DbSkill> = state
            .skills
            .iter()
            .filter(|s| category.as_ref().map_or(true, |c| &s.category == c))
            .cloned()
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    async fn find_skill(&self, id: Uuid) -> DbResult<Option<DbSkill>> {
        Ok(self.state.lock().skills.iter().find(|s| s.id == id).cloned())
    }

    async fn list_agent_skills(&self, agent_id: Uuid) -> DbResult<Vec<AgentSkillListing>> {
        let state = self.state.lock();
        Ok(state
            .agent_skills
            .iter()
            .rev()
            .filter(|(agent, ..)| *agent == agent_id)
            .filter_map(|(_, skill, level, at)| state.skill_listing(*skill, *level, *at))
            .collect())
    }

    async fn add_agent_skill(&self, new: NewAgentSkill) -> DbResult<AgentSkillListing> {
        let mut state = self.state.lock();
        if state
            .agent_skills
            .iter()
            .any(|(agent, skill, ..)| *agent == new.agent_id && *skill == new.skill_id)
        {
            return Err(DbError::Duplicate("You already have this skill".to_string()));
        }

        let now = Utc::now();
        let listing = state
            .skill_listing(new.skill_id, new.proficiency_level, now)
            .ok_or_else(|| DbError::NotFound("Skill not found".to_string()))?;
        state
            .agent_skills
            .push((new.agent_id, new.skill_id, new.proficiency_level, now));
        Ok(listing)
    }

    async fn remove_agent_skill(&self, agent_id: Uuid, skill_id: Uuid) -> DbResult<bool> {
        let mut state = self.state.lock();
        let before = state.agent_skills.len();
        state
            .agent_skills
            .retain(|(agent, skill, ..)| !(*agent == agent_id && *skill == skill_id));
        Ok(state.agent_skills.len() < before)
    }

    async fn list_portfolio(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbPortfolioItem>> {
        let state = self.state.lock();
        let mut items: Vec<DbPortfolioItem> = state
            .portfolio
            .iter()
            .filter(|p| p.agent_id == agent_id && p.is_public)
            .cloned()
            .collect();
        items.sort_by_key(|p| (Reverse(p.is_featured), Reverse(p.created_at)));
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn create_portfolio_item(&self, new: NewPortfolioItem) -> DbResult<DbPortfolioItem> {
        let item = DbPortfolioItem {
            id: Uuid::new_v4(),
            agent_id: new.agent_id,
            title: new.title,
            description: new.description,
            category: new.category,
            images: new.images,
            files: new.files,
            skills_used: new.skills_used,
            project_date: new.project_date,
            is_featured: new.is_featured,
            is_public: new.is_public,
            created_at: Utc::now(),
        };
        self.state.lock().portfolio.push(item.clone());
        Ok(item)
    }
}

#[async_trait]
impl CompanionStore for MockDatabase {
    async fn start_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession> {
        let mut state = self.state.lock();
        if state.sessions.iter().any(|s| {
            s.companion_id == companion_id && s.client_id == client_id && s.status == SessionStatus::Active
        }) {
            return Err(DbError::Duplicate(
                "You already have an active session with this companion".to_string(),
            ));
        }

        let session = DbCompanionSession {
            id: Uuid::new_v4(),
            companion_id,
            client_id,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<Option<DbCompanionSession>> {
        Ok(self
            .state
            .lock()
            .sessions
            .iter()
            .find(|s| s.companion_id == companion_id && s.client_id == client_id && s.status == SessionStatus::Active)
            .cloned())
    }

    async fn end_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.companion_id == companion_id && s.client_id == client_id && s.status == SessionStatus::Active)
            .ok_or_else(|| DbError::InvalidState("No active session with this companion".to_string()))?;
        session.status = SessionStatus::Ended;
        session.ended_at = Some(Utc::now());
        Ok(session.clone())
    }
}

#[async_trait]
impl MarketStore for MockDatabase {
    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use solveby_types::{Category, OrderQuote, Page, Rating, Urgency};

    async fn agent(db: &MockDatabase, name: &str) -> DbAgent {
        db.register_agent(NewAgent {
            name: name.to_string(),
            description: None,
            api_key_hash: format!("hash-{}", name),
            wallet_address: None,
            starting_balance: dec!(100),
        })
        .await
        .unwrap()
    }

    fn hire(service: &DbService, client: &DbAgent) -> NewHire {
        NewHire {
            service_id: service.id,
            client_id: client.id,
            client_name: client.name.clone(),
            provider_id: service.agent_id,
            title: service.title.clone(),
            quote: OrderQuote::compute(service.price, None, &[]),
            addons: serde_json::json!([]),
            requirements: None,
            deadline: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_registration_credits_bonus_with_audit_row() {
        let db = MockDatabase::new();
        let alice = agent(&db, "alice").await;
        assert_eq!(alice.crust_balance, dec!(100));

        let rows = db.transactions_of(alice.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, BalanceReason::RegistrationBonus);
        assert_eq!(rows[0].balance_before, Decimal::ZERO);
        assert_eq!(rows[0].balance_after, dec!(100));

        let dup = db
            .register_agent(NewAgent {
                name: "alice".to_string(),
                description: None,
                api_key_hash: "other".to_string(),
                wallet_address: None,
                starting_balance: dec!(100),
            })
            .await;
        assert!(matches!(dup, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_completion_pays_once() {
        let db = MockDatabase::new();
        let client = agent(&db, "client").await;
        let provider = agent(&db, "provider").await;
        let service = db
            .create_service(NewService {
                agent_id: provider.id,
                title: "Audit".to_string(),
                description: "Audit a crate".to_string(),
                category: Category::parse("security").unwrap(),
                price: dec!(10),
            })
            .await
            .unwrap();

        let job = db.hire_service(hire(&service, &client)).await.unwrap();
        db.deliver_job(job.id, None).await.unwrap();
        db.complete_job(job.id).await.unwrap();

        let retry = db.complete_job(job.id).await;
        assert!(matches!(retry, Err(DbError::InvalidState(_))));

        let provider = db.find_agent(provider.id).await.unwrap().unwrap();
        assert_eq!(provider.crust_balance, dec!(110));
        assert_eq!(provider.karma, COMPLETION_KARMA);
    }

    #[tokio::test]
    async fn test_failed_debit_leaves_no_job() {
        let db = MockDatabase::new();
        let client = agent(&db, "client").await;
        let provider = agent(&db, "provider").await;
        let service = db
            .create_service(NewService {
                agent_id: provider.id,
                title: "Expensive".to_string(),
                description: "Too much".to_string(),
                category: Category::parse("misc").unwrap(),
                price: dec!(500),
            })
            .await
            .unwrap();

        let result = db.hire_service(hire(&service, &client)).await;
        assert!(matches!(
            result,
            Err(DbError::InsufficientBalance { available, required })
                if available == dec!(100) && required == dec!(500)
        ));

        let jobs = db
            .list_jobs(JobFilter {
                agent_id: client.id,
                role: None,
                status: None,
                page: Page::new(None, None, 20, 50),
            })
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_review_recomputes_service_rating() {
        let db = MockDatabase::new();
        let client = agent(&db, "client").await;
        let provider = agent(&db, "provider").await;
        let service = db
            .create_service(NewService {
                agent_id: provider.id,
                title: "Logo".to_string(),
                description: "A logo".to_string(),
                category: Category::parse("design").unwrap(),
                price: dec!(5),
            })
            .await
            .unwrap();

        let job = db.hire_service(hire(&service, &client)).await.unwrap();
        db.deliver_job(job.id, Some("done".to_string())).await.unwrap();
        db.complete_job(job.id).await.unwrap();
        db.submit_review(NewReview {
            job_id: job.id,
            reviewer_id: client.id,
            reviewee_id: provider.id,
            rating: Rating::new(4).unwrap(),
            content: None,
        })
        .await
        .unwrap();

        let service = db.find_service(service.id).await.unwrap().unwrap();
        assert_eq!(service.avg_rating, Some(dec!(4)));
        assert_eq!(service.orders_count, 1);

        let messages = db.list_messages(job.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.content.starts_with(DELIVERY_MESSAGE_PREFIX));
    }

    #[tokio::test]
    async fn test_tip_moves_balance_and_accumulators() {
        let db = MockDatabase::new();
        let alice = agent(&db, "alice").await;
        let bob = agent(&db, "bob").await;

        let receipt = db
            .send_tip(NewTip {
                from_agent_id: alice.id,
                from_agent_name: alice.name.clone(),
                to_agent_id: bob.id,
                amount: dec!(5),
                message: None,
                job_id: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.sender_balance, dec!(95));

        let alice = db.find_agent(alice.id).await.unwrap().unwrap();
        let bob = db.find_agent(bob.id).await.unwrap().unwrap();
        assert_eq!(alice.tips_given, dec!(5));
        assert_eq!(bob.tips_received, dec!(5));
        assert_eq!(bob.crust_balance, dec!(105));
    }

    #[tokio::test]
    async fn test_only_the_request_owner_can_accept() {
        let db = MockDatabase::new();
        let owner = agent(&db, "owner").await;
        let worker = agent(&db, "worker").await;
        let stranger = agent(&db, "stranger").await;

        let request = db
            .create_request(NewRequest {
                agent_id: owner.id,
                title: "Translate".to_string(),
                description: "Into French".to_string(),
                category: Category::parse("writing").unwrap(),
                budget: dec!(20),
                urgency: Urgency::Medium,
            })
            .await
            .unwrap();
        let proposal = db
            .submit_proposal(NewProposal {
                request_id: request.id,
                agent_id: worker.id,
                price: dec!(10),
                message: "Oui".to_string(),
                estimated_days: Some(2),
            })
            .await
            .unwrap();

        let result = db
            .accept_proposal(AcceptProposal {
                proposal_id: proposal.id,
                client_id: stranger.id,
                client_name: stranger.name.clone(),
            })
            .await;
        assert!(matches!(result, Err(DbError::Forbidden(_))));

        let stranger = db.find_agent(stranger.id).await.unwrap().unwrap();
        assert_eq!(stranger.crust_balance, dec!(100));
    }
}
