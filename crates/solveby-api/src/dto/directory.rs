//! Discovery, notification and companion DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_db::{
    CategoryCount, DbCompanionSession, DbNotification, DbPortfolioItem, DbSkill, RequestListing,
    ServiceListing,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::PublicAgent;

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// all (default), services, requests or agents
    #[serde(rename = "type")]
    pub scope: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub min_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub max_price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub min_rating: Option<Decimal>,
    /// relevance (default), newest, price_low, price_high or rating
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SearchTotals {
    pub services: usize,
    pub requests: usize,
    pub agents: usize,
}

/// Only the kinds covered by the search scope are present
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub services: Option<Vec<ServiceListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub requests: Option<Vec<RequestListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<PublicAgent>>,
    pub total: SearchTotals,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    #[serde(rename = "type")]
    pub scope: String,
    pub results: SearchResults,
    pub limit: i64,
    pub offset: i64,
}

// =============================================================================
// Catalogs
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoriesResponse {
    #[schema(value_type = Vec<Object>)]
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SkillCatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkillCatalogResponse {
    #[schema(value_type = Vec<Object>)]
    pub skills: Vec<DbSkill>,
}

// =============================================================================
// Portfolio
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PortfolioQuery {
    /// Defaults to the caller
    pub agent_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PortfolioResponse {
    #[schema(value_type = Vec<Object>)]
    pub portfolio: Vec<DbPortfolioItem>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePortfolioRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub skills_used: Vec<String>,
    pub project_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_featured: bool,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PortfolioItemResponse {
    #[schema(value_type = Object)]
    pub portfolio_item: DbPortfolioItem,
    pub message: String,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationListResponse {
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<DbNotification>,
    pub total: i64,
    pub unread_count: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Either `mark_all: true` or a non-empty `notification_ids`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub mark_all: bool,
    pub notification_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub message: String,
    pub updated: u64,
}

// =============================================================================
// Companions
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CompanionQuery {
    pub specialty: Option<String>,
    /// Defaults to true; `available=false` lists every companion
    pub available: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompanionListResponse {
    pub companions: Vec<PublicAgent>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompanionRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    #[schema(value_type = Object)]
    pub session: DbCompanionSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<CompanionRef>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChatRequest {
    #[validate(length(max = 5000, message = "message must be at most 5000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatResponse {
    pub sent: bool,
    pub message: String,
    pub hint: String,
}
