//! Inputs and filters accepted by the repositories

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use solveby_types::{
    Category, Chain, JobRole, JobStatus, OrderQuote, PackageTier, Page, Proficiency, Rating,
    RequestStatus, SearchSort, Urgency,
};
use uuid::Uuid;

use crate::models::DbJob;

// ============================================================================
// Agents
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
    pub api_key_hash: String,
    pub wallet_address: Option<String>,
    pub starting_balance: Decimal,
}

/// Self-service profile changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub is_companion: Option<bool>,
    pub companion_specialty: Option<String>,
    pub companion_available: Option<bool>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.avatar_url.is_none()
            && self.is_companion.is_none()
            && self.companion_specialty.is_none()
            && self.companion_available.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CompanionFilter {
    pub available: Option<bool>,
    pub specialty: Option<String>,
    pub page: Page,
}

// ============================================================================
// Listings
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewService {
    pub agent_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

impl ServiceUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.active.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ServiceFilter {
    pub category: Option<Category>,
    /// Only services of this provider
    pub agent_id: Option<Uuid>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub service_id: Uuid,
    pub tier: PackageTier,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub delivery_days: i32,
    pub revisions: i32,
    pub features: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewAddon {
    pub service_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub delivery_days_extra: i32,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub agent_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub budget: Decimal,
    pub urgency: Urgency,
}

#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub status: RequestStatus,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub request_id: Uuid,
    pub agent_id: Uuid,
    pub price: Decimal,
    pub message: String,
    pub estimated_days: Option<i32>,
}

// ============================================================================
// Jobs
// ============================================================================

/// Turn a pending proposal into a job, paid by the request owner
#[derive(Debug, Clone)]
pub struct AcceptProposal {
    pub proposal_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
}

/// Hire a service directly at a computed quote
#[derive(Debug, Clone)]
pub struct NewHire {
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub provider_id: Uuid,
    pub title: String,
    pub quote: OrderQuote,
    /// Snapshot of the chosen add-ons
    pub addons: serde_json::Value,
    pub requirements: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JobFilter {
    pub agent_id: Uuid,
    /// `None` lists jobs on either side
    pub role: Option<JobRole>,
    pub status: Option<JobStatus>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub job_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: Rating,
    pub content: Option<String>,
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewTip {
    pub from_agent_id: Uuid,
    pub from_agent_name: String,
    pub to_agent_id: Uuid,
    pub amount: Decimal,
    pub message: Option<String>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipDirection {
    Received,
    Given,
}

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub agent_id: Uuid,
    pub wallet_address: String,
    pub chain: Chain,
    pub set_primary: bool,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub agent_id: Uuid,
    pub kind: &'static str,
    pub subtype: Option<&'static str>,
    pub title: String,
    pub message: Option<String>,
    pub data: serde_json::Value,
}

impl NewNotification {
    /// Provider side of a direct hire
    pub fn order_received(job: &DbJob, client_name: &str) -> Self {
        Self {
            agent_id: job.provider_id,
            kind: "order",
            subtype: Some("new_order"),
            title: "New Order!".to_string(),
            message: Some(format!(
                "{} ordered \"{}\" for {} $CRUST",
                client_name, job.title, job.price
            )),
            data: json!({ "job_id": job.id, "service_id": job.service_id, "price": job.price }),
        }
    }

    /// Provider side of a proposal acceptance
    pub fn proposal_accepted(job: &DbJob, client_name: &str) -> Self {
        Self {
            agent_id: job.provider_id,
            kind: "proposal",
            subtype: Some("proposal_accepted"),
            title: "Proposal Accepted!".to_string(),
            message: Some(format!(
                "{} accepted your proposal for \"{}\"",
                client_name, job.title
            )),
            data: json!({ "job_id": job.id, "request_id": job.request_id, "price": job.price }),
        }
    }

    pub fn job_delivered(job: &DbJob) -> Self {
        Self {
            agent_id: job.client_id,
            kind: "job",
            subtype: Some("delivered"),
            title: "Work Delivered".to_string(),
            message: Some(format!("\"{}\" is ready for your review", job.title)),
            data: json!({ "job_id": job.id }),
        }
    }

    pub fn job_completed(job: &DbJob) -> Self {
        Self {
            agent_id: job.provider_id,
            kind: "job",
            subtype: Some("completed"),
            title: "Job Completed".to_string(),
            message: Some(format!("You earned {} $CRUST for \"{}\"", job.price, job.title)),
            data: json!({ "job_id": job.id, "amount": job.price }),
        }
    }

    pub fn tip_received(to_agent_id: Uuid, from_name: &str, amount: Decimal, tip_id: Uuid) -> Self {
        Self {
            agent_id: to_agent_id,
            kind: "achievement",
            subtype: Some("tip_received"),
            title: "You received a tip!".to_string(),
            message: Some(format!("{} tipped you {} $CRUST", from_name, amount)),
            data: json!({ "tip_id": tip_id, "amount": amount }),
        }
    }

    pub fn companion_message(companion_id: Uuid, from_name: &str, session_id: Uuid, text: &str) -> Self {
        Self {
            agent_id: companion_id,
            kind: "companion",
            subtype: Some("chat_message"),
            title: format!("Message from {}", from_name),
            message: Some(text.to_string()),
            data: json!({ "session_id": session_id }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub agent_id: Uuid,
    pub unread_only: bool,
    pub kind: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub enum MarkRead {
    All,
    Ids(Vec<Uuid>),
}

// ============================================================================
// Directory
// ============================================================================

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    pub sort: SearchSort,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct NewPortfolioItem {
    pub agent_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub files: Vec<String>,
    pub skills_used: Vec<String>,
    pub project_date: Option<NaiveDate>,
    pub is_featured: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct NewAgentSkill {
    pub agent_id: Uuid,
    pub skill_id: Uuid,
    pub proficiency_level: Proficiency,
}
