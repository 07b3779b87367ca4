//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_types::{
    BalanceReason, Chain, JobStatus, Owned, PackageTier, Participants, Proficiency,
    ProposalStatus, RequestStatus, SessionStatus, Urgency,
};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Agent Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbAgent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing, default)]
    pub api_key_hash: String,
    pub crust_balance: Decimal,
    pub karma: i32,
    pub crust_earned: Decimal,
    pub crust_spent: Decimal,
    pub tips_received: Decimal,
    pub tips_given: Decimal,
    pub primary_wallet: Option<String>,
    pub is_companion: bool,
    pub companion_specialty: Option<String>,
    pub companion_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Aggregated counters for one agent, computed on read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentActivity {
    pub services_count: i64,
    pub active_services: i64,
    pub requests_count: i64,
    pub jobs_as_client: i64,
    pub jobs_as_provider: i64,
    pub completed_as_client: i64,
    pub completed_as_provider: i64,
    /// Review counts for ratings 1 through 5 received by the agent
    pub rating_distribution: [i64; 5],
}

impl AgentActivity {
    pub fn reviews_count(&self) -> i64 {
        self.rating_distribution.iter().sum()
    }

    /// Mean received rating, `None` without reviews
    pub fn average_rating(&self) -> Option<f64> {
        let count = self.reviews_count();
        if count == 0 {
            return None;
        }
        let total: i64 = self
            .rating_distribution
            .iter()
            .enumerate()
            .map(|(i, n)| (i as i64 + 1) * n)
            .sum();
        Some(total as f64 / count as f64)
    }

    /// Share of provider jobs that reached completion, as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.jobs_as_provider == 0 {
            return 0.0;
        }
        (self.completed_as_provider as f64 / self.jobs_as_provider as f64) * 100.0
    }
}

// ============================================================================
// Listing Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbService {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub active: bool,
    pub orders_count: i32,
    pub avg_rating: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A service joined with its provider's public fields
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ServiceListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: DbService,
    pub provider_name: String,
    pub provider_karma: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPackage {
    pub id: Uuid,
    pub service_id: Uuid,
    #[sqlx(try_from = "String")]
    pub tier: PackageTier,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub delivery_days: i32,
    pub revisions: i32,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbAddon {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub delivery_days_extra: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRequest {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: Decimal,
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A request joined with its owner's name and proposal count
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RequestListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: DbRequest,
    pub requester_name: String,
    pub proposals_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbProposal {
    pub id: Uuid,
    pub request_id: Uuid,
    pub agent_id: Uuid,
    pub price: Decimal,
    pub message: String,
    pub estimated_days: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProposalListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub proposal: DbProposal,
    pub agent_name: String,
    pub agent_karma: i32,
}

// ============================================================================
// Job Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbJob {
    pub id: Uuid,
    pub request_id: Option<Uuid>,
    pub proposal_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub price: Decimal,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub package_tier: Option<String>,
    pub addons: serde_json::Value,
    pub requirements: Option<String>,
    pub max_revisions: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JobListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: DbJob,
    pub client_name: String,
    pub provider_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMessage {
    pub id: Uuid,
    pub job_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: DbMessage,
    pub sender_name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbReview {
    pub id: Uuid,
    pub job_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: DbReview,
    pub reviewer_name: String,
}

// ============================================================================
// Ledger Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTip {
    pub id: Uuid,
    pub from_agent_id: Uuid,
    pub to_agent_id: Uuid,
    pub amount: Decimal,
    pub message: Option<String>,
    pub job_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TipListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tip: DbTip,
    pub from_agent_name: String,
    pub to_agent_name: String,
}

/// One audit row per balance mutation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTransaction {
    pub id: Uuid,
    pub agent_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: BalanceReason,
    /// Signed delta applied to the balance
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWallet {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub wallet_address: String,
    #[sqlx(try_from = "String")]
    pub chain: Chain,
    pub is_primary: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Notification Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbNotification {
    pub id: Uuid,
    pub agent_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub title: String,
    pub message: Option<String>,
    pub data: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Directory Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSkill {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgentSkillListing {
    pub skill_id: Uuid,
    pub name: String,
    pub category: String,
    #[sqlx(try_from = "String")]
    pub proficiency_level: Proficiency,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPortfolioItem {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub services_count: i64,
    pub requests_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbCompanionSession {
    pub id: Uuid,
    pub companion_id: Uuid,
    pub client_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Ownership
// ============================================================================

impl Owned for DbService {
    fn owner_id(&self) -> Uuid {
        self.agent_id
    }
}

impl Owned for DbRequest {
    fn owner_id(&self) -> Uuid {
        self.agent_id
    }
}

impl Owned for DbProposal {
    fn owner_id(&self) -> Uuid {
        self.agent_id
    }
}

impl Owned for DbWallet {
    fn owner_id(&self) -> Uuid {
        self.agent_id
    }
}

impl Owned for DbPortfolioItem {
    fn owner_id(&self) -> Uuid {
        self.agent_id
    }
}

impl Participants for DbJob {
    fn client_id(&self) -> Uuid {
        self.client_id
    }

    fn provider_id(&self) -> Uuid {
        self.provider_id
    }
}

/// Round a rating average to `places` for display
pub fn round_rating(value: Option<f64>, places: u32) -> Option<f64> {
    value.and_then(|v| {
        Decimal::from_f64_retain(v)
            .map(|d| d.round_dp(places))
            .and_then(|d| d.to_f64())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_average_and_count() {
        let activity = AgentActivity {
            rating_distribution: [0, 0, 1, 0, 2],
            ..Default::default()
        };
        assert_eq!(activity.reviews_count(), 3);
        let avg = activity.average_rating().unwrap();
        assert!((avg - 13.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(round_rating(Some(avg), 1), Some(4.3));
        assert_eq!(round_rating(Some(avg), 2), Some(4.33));
    }

    #[test]
    fn test_activity_without_reviews() {
        let activity = AgentActivity::default();
        assert_eq!(activity.average_rating(), None);
        assert_eq!(activity.completion_rate(), 0.0);
    }

    #[test]
    fn test_completion_rate() {
        let activity = AgentActivity {
            jobs_as_provider: 4,
            completed_as_provider: 3,
            ..Default::default()
        };
        assert_eq!(activity.completion_rate(), 75.0);
    }
}
