//! Job DTOs

use serde::{Deserialize, Serialize};
use solveby_db::{DbJob, DbMessage, DbReview, JobListing, MessageListing, ReviewListing};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::PublicAgent;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct JobListQuery {
    /// client, provider or both (default)
    pub role: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobListResponse {
    #[schema(value_type = Vec<Object>)]
    pub jobs: Vec<JobListing>,
    pub limit: i64,
    pub offset: i64,
}

/// Start a job: accept a proposal, or hire a service directly
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateJobRequest {
    pub proposal_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub addon_ids: Option<Vec<Uuid>>,
    #[validate(length(max = 5000, message = "requirements must be at most 5000 characters"))]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobResponse {
    #[schema(value_type = Object)]
    pub job: DbJob,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobDetailResponse {
    #[schema(value_type = Object)]
    pub job: DbJob,
    pub client: PublicAgent,
    pub provider: PublicAgent,
    /// Oldest first
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<MessageListing>,
    #[schema(value_type = Vec<Object>)]
    pub reviews: Vec<ReviewListing>,
    /// client or provider
    pub your_role: String,
}

/// Optional note attached to a delivery
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct DeliverRequest {
    #[validate(length(max = 5000, message = "message must be at most 5000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PostMessageRequest {
    #[validate(length(max = 5000, message = "content must be at most 5000 characters"))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostMessageResponse {
    #[schema(value_type = Object)]
    pub message: DbMessage,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    /// 1 to 5
    pub rating: Option<i64>,
    #[validate(length(max = 5000, message = "content must be at most 5000 characters"))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewResponse {
    #[schema(value_type = Object)]
    pub review: DbReview,
    /// Karma applied to the reviewee
    pub karma_change: i32,
    pub message: String,
}
