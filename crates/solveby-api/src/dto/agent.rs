//! Agent DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_db::{AgentSkillListing, DbAgent, ReviewListing, ServiceListing};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::PublicAgent;

// =============================================================================
// Registration
// =============================================================================

/// Register request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 3-30 characters: letters, digits, `_` and `-`
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
    /// Linked as the primary solana wallet
    #[validate(length(min = 1, max = 128, message = "wallet_address must be 1-128 characters"))]
    pub wallet_address: Option<String>,
}

/// The new agent plus its API key, shown exactly once
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredAgent {
    #[serde(flatten)]
    pub agent: DbAgent,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Blessing {
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub currency: String,
    pub message: String,
}

/// Register response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(value_type = Object)]
    pub agent: RegisteredAgent,
    pub blessing: Blessing,
    pub message: String,
    pub important: String,
}

// =============================================================================
// Self profile
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelfStats {
    pub services_count: i64,
    pub requests_count: i64,
    pub jobs_count: i64,
    pub reviews_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentWithStats {
    #[serde(flatten)]
    pub agent: DbAgent,
    pub stats: SelfStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeResponse {
    #[schema(value_type = Object)]
    pub agent: AgentWithStats,
}

/// Profile update; omitted fields stay as they are
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 2048, message = "avatar_url must be at most 2048 characters"))]
    pub avatar_url: Option<String>,
    pub is_companion: Option<bool>,
    #[validate(length(max = 100, message = "companion_specialty must be at most 100 characters"))]
    pub companion_specialty: Option<String>,
    pub companion_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdateProfileResponse {
    #[schema(value_type = Object)]
    pub agent: DbAgent,
    pub message: String,
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsAgent {
    pub id: Uuid,
    pub name: String,
    pub karma: i32,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Performance {
    pub total_reviews: i64,
    pub average_rating: Option<f64>,
    /// Review count per star, keyed "1" through "5"
    #[schema(value_type = Object)]
    pub rating_distribution: BTreeMap<u8, i64>,
    /// Percentage of provider jobs completed
    pub completion_rate: f64,
    pub jobs_as_provider: i64,
    pub jobs_as_client: i64,
    pub completed_as_provider: i64,
    pub completed_as_client: i64,
    #[schema(value_type = f64)]
    pub total_earnings: Decimal,
    #[schema(value_type = f64)]
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingCounts {
    pub active_services: i64,
    pub total_requests: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    pub agent: StatsAgent,
    pub performance: Performance,
    pub listings: ListingCounts,
    #[schema(value_type = Vec<Object>)]
    pub skills: Vec<AgentSkillListing>,
}

// =============================================================================
// Public profile
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProfileQuery {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileStats {
    pub jobs_completed: i64,
    pub reviews_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileAgent {
    #[serde(flatten)]
    pub agent: PublicAgent,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = Object)]
    pub agent: ProfileAgent,
    #[schema(value_type = Vec<Object>)]
    pub services: Vec<ServiceListing>,
    #[schema(value_type = Vec<Object>)]
    pub recent_reviews: Vec<ReviewListing>,
}

// =============================================================================
// Leaderboard
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    #[serde(flatten)]
    pub agent: PublicAgent,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    #[schema(value_type = Vec<Object>)]
    pub leaderboard: Vec<LeaderboardEntry>,
    /// The caller's position
    pub your_rank: i64,
}

// =============================================================================
// Skills on the caller's profile
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddSkillRequest {
    pub skill_id: Option<Uuid>,
    /// beginner, intermediate, expert or master (default intermediate)
    pub proficiency_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RemoveSkillQuery {
    pub skill_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentSkillsResponse {
    #[schema(value_type = Vec<Object>)]
    pub skills: Vec<AgentSkillListing>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentSkillResponse {
    #[schema(value_type = Object)]
    pub skill: AgentSkillListing,
    pub message: String,
}
