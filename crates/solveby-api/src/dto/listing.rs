//! Service, package, add-on, request and proposal DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_db::{
    DbAddon, DbJob, DbPackage, DbProposal, DbRequest, DbService, ProposalListing, RequestListing,
    ServiceListing,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::PublicAgent;

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ServiceListQuery {
    pub category: Option<String>,
    /// Only services of this provider
    pub agent_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub services: Vec<ServiceListing>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

/// Create service request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateServiceRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
    /// Free-form; normalized to lowercase-hyphenated
    pub category: Option<String>,
    /// $CRUST, at least 0.01
    #[serde(alias = "price_credits", alias = "price_crust")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
}

/// Partial service update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "description must be 1-5000 characters"))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "price_credits", alias = "price_crust")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceResponse {
    #[schema(value_type = Object)]
    pub service: DbService,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderStats {
    pub reviews_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: DbService,
    pub provider: PublicAgent,
    pub provider_stats: ProviderStats,
    pub packages: Vec<DbPackage>,
    pub addons: Vec<DbAddon>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceDetailResponse {
    #[schema(value_type = Object)]
    pub service: ServiceDetail,
}

// =============================================================================
// Packages and add-ons
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePackageRequest {
    /// basic, standard or premium
    pub tier: Option<String>,
    #[validate(length(max = 100, message = "name must be at most 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "price_credits", alias = "price_crust")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 1, max = 365, message = "delivery_days must be between 1 and 365"))]
    pub delivery_days: Option<i32>,
    #[validate(range(min = 0, message = "revisions must not be negative"))]
    pub revisions: Option<i32>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackagesResponse {
    #[schema(value_type = Vec<Object>)]
    pub packages: Vec<DbPackage>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageResponse {
    #[schema(value_type = Object)]
    pub package: DbPackage,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAddonRequest {
    #[validate(length(max = 100, message = "name must be at most 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "price_credits", alias = "price_crust")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, max = 365, message = "delivery_days_extra must be between 0 and 365"))]
    pub delivery_days_extra: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddonsResponse {
    #[schema(value_type = Vec<Object>)]
    pub addons: Vec<DbAddon>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddonResponse {
    #[schema(value_type = Object)]
    pub addon: DbAddon,
    pub message: String,
}

// =============================================================================
// Direct hire
// =============================================================================

/// Order a service, optionally a package tier and add-ons
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct OrderRequest {
    pub package_id: Option<Uuid>,
    pub addon_ids: Option<Vec<Uuid>>,
    #[validate(length(max = 5000, message = "requirements must be at most 5000 characters"))]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuoteView {
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub delivery_days: i32,
    pub revisions: i32,
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    #[schema(value_type = Object)]
    pub job: DbJob,
    pub quote: QuoteView,
    pub message: String,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestListQuery {
    /// open (default), in_progress, completed or cancelled
    pub status: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestListResponse {
    #[schema(value_type = Vec<Object>)]
    pub requests: Vec<RequestListing>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRequestRequest {
    #[validate(length(max = 200, message = "title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
    pub category: Option<String>,
    /// $CRUST, at least 0.01 and no more than the caller's balance
    #[serde(alias = "budget_credits", alias = "budget_crust")]
    #[schema(value_type = Option<f64>)]
    pub budget: Option<Decimal>,
    /// low, medium (default), high or urgent
    pub urgency: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestCreatedResponse {
    #[schema(value_type = Object)]
    pub request: DbRequest,
    pub message: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetailResponse {
    #[schema(value_type = Object)]
    pub request: DbRequest,
    /// Visible to the request owner only
    #[schema(value_type = Vec<Object>)]
    pub proposals: Vec<ProposalListing>,
    #[schema(value_type = Option<Object>)]
    pub my_proposal: Option<DbProposal>,
    pub is_owner: bool,
}

// =============================================================================
// Proposals
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProposalRequest {
    #[validate(length(max = 5000, message = "message must be at most 5000 characters"))]
    pub message: Option<String>,
    #[serde(alias = "price_credits", alias = "price_crust")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 1, max = 365, message = "estimated_days must be between 1 and 365"))]
    pub estimated_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProposalResponse {
    #[schema(value_type = Object)]
    pub proposal: DbProposal,
    pub message: String,
}
