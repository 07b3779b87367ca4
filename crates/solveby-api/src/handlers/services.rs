//! Service Handlers
//!
//! Fixed-price offers, their package tiers and add-ons, and direct orders.

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::{round_rating, DbService, NewAddon, NewPackage, NewService, ServiceFilter, ServiceUpdate};
use solveby_types::{
    parse_amount, Category, Owned, PackageTier, Page, TypesError, CURRENCY, DEFAULT_DELIVERY_DAYS,
    DEFAULT_REVISIONS,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::dto::{
    created, non_blank, ok, AddonResponse, AddonsResponse, CreateAddonRequest, CreatePackageRequest,
    CreateServiceRequest, Created, MessageResponse, OrderRequest, OrderResponse, PackageResponse,
    PackagesResponse, ProviderStats, PublicAgent, QuoteView, Reply, ServiceDetail,
    ServiceDetailResponse, ServiceListQuery, ServiceListResponse, ServiceResponse,
    UpdateServiceRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{OptionalJson, PathId, ValidatedJson, ValidatedQuery};
use crate::handlers::{category_filter, jobs, load_agent};
use crate::state::AppState;

/// Active service, 404 otherwise
async fn load_service(state: &AppState, id: Uuid) -> ApiResult<DbService> {
    state
        .store
        .find_service(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))
}

/// Service the caller owns, 403 for anyone else
async fn load_own_service(state: &AppState, id: Uuid, caller: Uuid, denied: &str) -> ApiResult<DbService> {
    let service = load_service(state, id).await?;
    if !service.is_owned_by(caller) {
        return Err(ApiError::forbidden(denied));
    }
    Ok(service)
}

/// Browse active services
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "Services",
    params(
        ("category" = Option<String>, Query, description = "Category filter"),
        ("agent_id" = Option<Uuid>, Query, description = "Provider filter"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Active services", body = ServiceListResponse))
)]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<ServiceListQuery>,
) -> Reply<ServiceListResponse> {
    let page = Page::new(query.limit, query.offset, 20, 50);
    let services = state
        .store
        .list_services(ServiceFilter {
            category: category_filter(query.category)?,
            agent_id: query.agent_id,
            page,
        })
        .await?;

    ok(ServiceListResponse {
        count: services.len(),
        services,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Publish a service
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "Services",
    request_body = CreateServiceRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse)
    )
)]
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<CreateServiceRequest>,
) -> Created<ServiceResponse> {
    let (Some(title), Some(description), Some(category), Some(price)) = (
        non_blank(req.title),
        non_blank(req.description),
        non_blank(req.category),
        req.price,
    ) else {
        return Err(ApiError::bad_request("Missing required fields")
            .with_hint("Provide title, description, category, and price"));
    };

    let service = state
        .store
        .create_service(NewService {
            agent_id: caller.id,
            title,
            description,
            category: Category::parse(&category)?,
            price: parse_amount(price, "price")?,
        })
        .await?;

    info!(service_id = %service.id, agent_id = %caller.id, "Service created");

    created(ServiceResponse {
        service,
        message: "🎉 Service created! Other agents can now find and hire you.".to_string(),
    })
}

/// Service detail with provider, packages and add-ons
#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Service detail", body = ServiceDetailResponse),
        (status = 404, description = "Service not found", body = ErrorResponse)
    )
)]
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<ServiceDetailResponse> {
    let service = load_service(&state, id).await?;
    let provider = load_agent(&state, service.agent_id).await?;
    let activity = state.store.agent_activity(provider.id).await?;
    let packages = state.store.list_packages(id).await?;
    let addons = state.store.list_addons(id).await?;

    ok(ServiceDetailResponse {
        service: ServiceDetail {
            service,
            provider: PublicAgent::from(provider),
            provider_stats: ProviderStats {
                reviews_count: activity.reviews_count(),
                average_rating: round_rating(activity.average_rating(), 1),
            },
            packages,
            addons,
        },
    })
}

/// Partially update an owned service
#[utoipa::path(
    patch,
    path = "/api/v1/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = UpdateServiceRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Service updated", body = ServiceResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Service not found", body = ErrorResponse)
    )
)]
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<UpdateServiceRequest>,
) -> Reply<ServiceResponse> {
    load_own_service(&state, id, caller.id, "You can only modify your own services").await?;

    let update = ServiceUpdate {
        title: non_blank(req.title),
        description: non_blank(req.description),
        category: category_filter(req.category)?,
        price: req.price.map(|p| parse_amount(p, "price")).transpose()?,
        active: req.active,
    };
    if update.is_empty() {
        return Err(ApiError::bad_request("No valid fields to update"));
    }

    let service = state.store.update_service(id, update).await?;
    ok(ServiceResponse {
        service,
        message: "Service updated successfully".to_string(),
    })
}

/// Soft-delete an owned service
#[utoipa::path(
    delete,
    path = "/api/v1/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Service deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Service not found", body = ErrorResponse)
    )
)]
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<MessageResponse> {
    load_own_service(&state, id, caller.id, "You can only delete your own services").await?;
    state.store.delete_service(id).await?;

    info!(service_id = %id, agent_id = %caller.id, "Service deleted");
    ok(MessageResponse::new("Service deleted successfully"))
}

// =============================================================================
// Packages
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/services/{id}/packages",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Packages, cheapest first", body = PackagesResponse))
)]
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<PackagesResponse> {
    load_service(&state, id).await?;
    let packages = state.store.list_packages(id).await?;
    ok(PackagesResponse { packages })
}

/// Add a package tier to an owned service
#[utoipa::path(
    post,
    path = "/api/v1/services/{id}/packages",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = CreatePackageRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Package created", body = PackageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 409, description = "Tier already defined", body = ErrorResponse)
    )
)]
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<CreatePackageRequest>,
) -> Created<PackageResponse> {
    load_own_service(&state, id, caller.id, "You can only add packages to your own services").await?;

    let (Some(tier), Some(name), Some(price)) = (non_blank(req.tier), non_blank(req.name), req.price) else {
        return Err(ApiError::bad_request("Missing required fields").with_hint("Provide tier, name, and price"));
    };
    let tier: PackageTier = tier
        .parse()
        .map_err(|e: TypesError| ApiError::from(e).with_hint("Use: basic, standard, or premium"))?;

    let package = state
        .store
        .create_package(NewPackage {
            service_id: id,
            tier,
            name,
            description: non_blank(req.description),
            price: parse_amount(price, "price")?,
            delivery_days: req.delivery_days.unwrap_or(DEFAULT_DELIVERY_DAYS),
            revisions: req.revisions.unwrap_or(DEFAULT_REVISIONS),
            features: req.features.unwrap_or_default(),
        })
        .await?;

    created(PackageResponse {
        package,
        message: "Package created".to_string(),
    })
}

// =============================================================================
// Add-ons
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/services/{id}/addons",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Active add-ons", body = AddonsResponse))
)]
pub async fn list_addons(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<AddonsResponse> {
    load_service(&state, id).await?;
    let addons = state.store.list_addons(id).await?;
    ok(AddonsResponse { addons })
}

#[utoipa::path(
    post,
    path = "/api/v1/services/{id}/addons",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = CreateAddonRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Add-on created", body = AddonResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse)
    )
)]
pub async fn create_addon(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<CreateAddonRequest>,
) -> Created<AddonResponse> {
    load_own_service(&state, id, caller.id, "You can only add add-ons to your own services").await?;

    let (Some(name), Some(price)) = (non_blank(req.name), req.price) else {
        return Err(ApiError::bad_request("Missing required fields").with_hint("Provide name and price"));
    };

    let addon = state
        .store
        .create_addon(NewAddon {
            service_id: id,
            name,
            description: non_blank(req.description),
            price: parse_amount(price, "price")?,
            delivery_days_extra: req.delivery_days_extra.unwrap_or(0),
        })
        .await?;

    created(AddonResponse {
        addon,
        message: "Add-on created".to_string(),
    })
}

// =============================================================================
// Direct order
// =============================================================================

/// Hire a service directly, optionally with a package and add-ons
///
/// The body may be omitted for a plain order at the base price.
#[utoipa::path(
    post,
    path = "/api/v1/services/{id}/order",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = OrderRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Unavailable, own service or insufficient balance", body = ErrorResponse),
        (status = 404, description = "Service or package not found", body = ErrorResponse)
    )
)]
pub async fn order_service(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    OptionalJson(req): OptionalJson<OrderRequest>,
) -> Created<OrderResponse> {
    let (job, quote) = jobs::hire(
        &state,
        &caller,
        id,
        req.package_id,
        req.addon_ids.unwrap_or_default(),
        non_blank(req.requirements),
    )
    .await?;

    let message = format!(
        "Order placed! {} {} charged. The provider will start working on your request.",
        quote.price.normalize(),
        CURRENCY
    );

    created(OrderResponse {
        job,
        quote: QuoteView {
            price: quote.price,
            delivery_days: quote.delivery_days,
            revisions: quote.revisions,
            tier: quote.tier.map(|t| t.as_str().to_string()),
        },
        message,
    })
}
