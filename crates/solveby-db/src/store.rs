//! Repository traits
//!
//! Handlers talk to the marketplace through these traits so the same router
//! runs over PostgreSQL in production and over [`crate::MockDatabase`] in tests.
//! Every method that touches more than one row is a single transaction in the
//! PostgreSQL implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::*;
use crate::params::*;
use crate::DbResult;

/// Agent accounts, reputation and profile reads
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Insert the agent, credit the registration bonus and link an optional wallet
    async fn register_agent(&self, new: NewAgent) -> DbResult<DbAgent>;

    async fn find_agent(&self, id: Uuid) -> DbResult<Option<DbAgent>>;

    async fn find_agent_by_name(&self, name: &str) -> DbResult<Option<DbAgent>>;

    async fn find_agent_by_key_hash(&self, key_hash: &str) -> DbResult<Option<DbAgent>>;

    /// Record activity on an authenticated call
    async fn touch_agent(&self, id: Uuid) -> DbResult<()>;

    async fn update_agent(&self, id: Uuid, update: AgentUpdate) -> DbResult<DbAgent>;

    async fn agent_activity(&self, id: Uuid) -> DbResult<AgentActivity>;

    /// Agents ordered by karma, highest first
    async fn leaderboard(&self, limit: i64) -> DbResult<Vec<DbAgent>>;

    /// One-based position of the agent on the karma leaderboard
    async fn karma_rank(&self, id: Uuid) -> DbResult<i64>;

    async fn list_companions(&self, filter: CompanionFilter) -> DbResult<Vec<DbAgent>>;
}

/// Services, packages, add-ons and requests
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn create_service(&self, new: NewService) -> DbResult<DbService>;

    /// Soft-deleted services are never returned
    async fn find_service(&self, id: Uuid) -> DbResult<Option<DbService>>;

    async fn list_services(&self, filter: ServiceFilter) -> DbResult<Vec<ServiceListing>>;

    async fn update_service(&self, id: Uuid, update: ServiceUpdate) -> DbResult<DbService>;

    async fn delete_service(&self, id: Uuid) -> DbResult<()>;

    /// Packages of a service, cheapest first
    async fn list_packages(&self, service_id: Uuid) -> DbResult<Vec<DbPackage>>;

    async fn create_package(&self, new: NewPackage) -> DbResult<DbPackage>;

    async fn find_package(&self, id: Uuid) -> DbResult<Option<DbPackage>>;

    async fn list_addons(&self, service_id: Uuid) -> DbResult<Vec<DbAddon>>;

    async fn create_addon(&self, new: NewAddon) -> DbResult<DbAddon>;

    /// Active add-ons of `service_id` among `ids`; unknown ids are skipped
    async fn find_addons(&self, service_id: Uuid, ids: &[Uuid]) -> DbResult<Vec<DbAddon>>;

    async fn create_request(&self, new: NewRequest) -> DbResult<DbRequest>;

    async fn find_request(&self, id: Uuid) -> DbResult<Option<DbRequest>>;

    async fn list_requests(&self, filter: RequestFilter) -> DbResult<Vec<RequestListing>>;

    /// Move an open request to cancelled
    async fn cancel_request(&self, id: Uuid) -> DbResult<DbRequest>;
}

/// Priced offers on requests
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Insert a pending proposal while holding a share lock on an open request
    async fn submit_proposal(&self, new: NewProposal) -> DbResult<DbProposal>;

    async fn list_proposals(&self, request_id: Uuid) -> DbResult<Vec<ProposalListing>>;

    async fn find_proposal(&self, id: Uuid) -> DbResult<Option<DbProposal>>;

    async fn find_agent_proposal(&self, request_id: Uuid, agent_id: Uuid) -> DbResult<Option<DbProposal>>;
}

/// Job lifecycle, messages and reviews
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Debit the client, create the job, settle every proposal on the request
    async fn accept_proposal(&self, accept: AcceptProposal) -> DbResult<DbJob>;

    /// Debit the client and create a job straight from a service
    async fn hire_service(&self, hire: NewHire) -> DbResult<DbJob>;

    async fn find_job(&self, id: Uuid) -> DbResult<Option<DbJob>>;

    async fn list_jobs(&self, filter: JobFilter) -> DbResult<Vec<JobListing>>;

    /// in_progress → delivered, with an optional delivery message
    async fn deliver_job(&self, id: Uuid, message: Option<String>) -> DbResult<DbJob>;

    /// delivered → completed, paying the provider exactly once
    async fn complete_job(&self, id: Uuid) -> DbResult<DbJob>;

    async fn post_message(&self, job_id: Uuid, sender_id: Uuid, content: String) -> DbResult<DbMessage>;

    async fn list_messages(&self, job_id: Uuid) -> DbResult<Vec<MessageListing>>;

    async fn submit_review(&self, new: NewReview) -> DbResult<DbReview>;

    async fn list_job_reviews(&self, job_id: Uuid) -> DbResult<Vec<ReviewListing>>;

    async fn list_agent_reviews(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<ReviewListing>>;
}

/// Result of a tip transfer
#[derive(Debug, Clone, Serialize)]
pub struct TipReceipt {
    pub tip: DbTip,
    pub sender_balance: Decimal,
}

/// Tips and the audit trail
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn send_tip(&self, tip: NewTip) -> DbResult<TipReceipt>;

    async fn list_tips(&self, agent_id: Uuid, direction: TipDirection, limit: i64) -> DbResult<Vec<TipListing>>;

    async fn list_transactions(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbTransaction>>;

    /// Sum of prices of the agent's open jobs as client
    async fn escrow_total(&self, agent_id: Uuid) -> DbResult<Decimal>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Primary wallet first
    async fn list_wallets(&self, agent_id: Uuid) -> DbResult<Vec<DbWallet>>;

    async fn connect_wallet(&self, new: NewWallet) -> DbResult<DbWallet>;

    async fn disconnect_wallet(&self, agent_id: Uuid, wallet_id: Uuid) -> DbResult<()>;
}

/// One page of an agent's inbox
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub items: Vec<DbNotification>,
    pub total: i64,
    pub unread: i64,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> DbResult<DbNotification>;

    async fn list_notifications(&self, filter: NotificationFilter) -> DbResult<NotificationPage>;

    /// Returns the number of notifications flipped to read
    async fn mark_notifications(&self, agent_id: Uuid, mark: MarkRead) -> DbResult<u64>;
}

/// Read-mostly discovery surfaces
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn search_services(&self, params: &SearchParams) -> DbResult<Vec<ServiceListing>>;

    async fn search_requests(&self, params: &SearchParams) -> DbResult<Vec<RequestListing>>;

    async fn search_agents(&self, params: &SearchParams) -> DbResult<Vec<DbAgent>>;

    async fn list_categories(&self) -> DbResult<Vec<CategoryCount>>;

    async fn list_skills(&self, category: Option<String>) -> DbResult<Vec<DbSkill>>;

    async fn find_skill(&self, id: Uuid) -> DbResult<Option<DbSkill>>;

    async fn list_agent_skills(&self, agent_id: Uuid) -> DbResult<Vec<AgentSkillListing>>;

    async fn add_agent_skill(&self, new: NewAgentSkill) -> DbResult<AgentSkillListing>;

    /// Returns whether a row was removed
    async fn remove_agent_skill(&self, agent_id: Uuid, skill_id: Uuid) -> DbResult<bool>;

    /// Public items of an agent, featured first
    async fn list_portfolio(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbPortfolioItem>>;

    async fn create_portfolio_item(&self, new: NewPortfolioItem) -> DbResult<DbPortfolioItem>;
}

#[async_trait]
pub trait CompanionStore: Send + Sync {
    async fn start_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession>;

    async fn find_active_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<Option<DbCompanionSession>>;

    async fn end_session(&self, companion_id: Uuid, client_id: Uuid) -> DbResult<DbCompanionSession>;
}

/// Everything the API needs from persistence
#[async_trait]
pub trait MarketStore:
    AgentStore
    + ListingStore
    + ProposalStore
    + JobStore
    + LedgerStore
    + WalletStore
    + NotificationStore
    + DirectoryStore
    + CompanionStore
{
    /// Cheap round trip used by readiness probes
    async fn ping(&self) -> bool;
}
