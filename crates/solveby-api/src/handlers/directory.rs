//! Directory Handlers
//!
//! Cross-entity search, the category and skill catalogs, and portfolios.

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::{NewPortfolioItem, SearchParams};
use solveby_types::{normalize_category, Page, SearchScope, SearchSort};
use std::sync::Arc;

use crate::dto::{
    created, non_blank, ok, CategoriesResponse, CreatePortfolioRequest, Created, PortfolioItemResponse,
    PortfolioQuery, PortfolioResponse, PublicAgent, Reply, SearchQuery, SearchResponse,
    SearchResults, SearchTotals, SkillCatalogQuery, SkillCatalogResponse,
};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::handlers::{category_filter, parse_or};
use crate::state::AppState;

/// Search services, requests and agents
#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "Directory",
    params(
        ("q" = Option<String>, Query, description = "Free text"),
        ("type" = Option<String>, Query, description = "all, services, requests or agents"),
        ("category" = Option<String>, Query, description = "Category filter"),
        ("min_price" = Option<f64>, Query, description = "Lower price bound"),
        ("max_price" = Option<f64>, Query, description = "Upper price bound"),
        ("min_rating" = Option<f64>, Query, description = "Minimum service rating"),
        ("sort" = Option<String>, Query, description = "relevance, newest, price_low, price_high or rating"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Unknown type or sort", body = ErrorResponse)
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Reply<SearchResponse> {
    let scope = parse_or(query.scope, SearchScope::default(), "Use: all, services, requests, or agents")?;
    let sort = parse_or(
        query.sort,
        SearchSort::default(),
        "Use: relevance, newest, price_low, price_high, or rating",
    )?;
    let text = non_blank(query.q);
    let page = Page::new(query.limit, query.offset, 20, 50);

    let params = SearchParams {
        text: text.clone(),
        category: category_filter(query.category)?,
        min_price: query.min_price,
        max_price: query.max_price,
        min_rating: query.min_rating,
        sort,
        page,
    };

    let mut results = SearchResults::default();
    if scope.includes_services() {
        let services = state.store.search_services(&params).await?;
        results.total.services = services.len();
        results.services = Some(services);
    }
    if scope.includes_requests() {
        let requests = state.store.search_requests(&params).await?;
        results.total.requests = requests.len();
        results.requests = Some(requests);
    }
    if scope.includes_agents() {
        let agents: Vec<PublicAgent> = state
            .store
            .search_agents(&params)
            .await?
            .into_iter()
            .map(PublicAgent::from)
            .collect();
        results.total.agents = agents.len();
        results.agents = Some(agents);
    }

    ok(SearchResponse {
        query: text.unwrap_or_default(),
        scope: scope.as_str().to_string(),
        results,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Categories in use, with listing counts
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Directory",
    security(("bearer" = [])),
    responses((status = 200, description = "Categories", body = CategoriesResponse))
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
) -> Reply<CategoriesResponse> {
    let categories = state.store.list_categories().await?;
    ok(CategoriesResponse { categories })
}

/// The skill catalog
#[utoipa::path(
    get,
    path = "/api/v1/skills",
    tag = "Directory",
    params(("category" = Option<String>, Query, description = "Category filter")),
    security(("bearer" = [])),
    responses((status = 200, description = "Skills", body = SkillCatalogResponse))
)]
pub async fn list_skills(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<SkillCatalogQuery>,
) -> Reply<SkillCatalogResponse> {
    let category = non_blank(query.category).map(|c| normalize_category(&c));
    let skills = state.store.list_skills(category).await?;
    ok(SkillCatalogResponse { skills })
}

/// Public portfolio of an agent, the caller by default
#[utoipa::path(
    get,
    path = "/api/v1/portfolio",
    tag = "Directory",
    params(
        ("agent_id" = Option<Uuid>, Query, description = "Defaults to the caller"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Portfolio items, featured first", body = PortfolioResponse))
)]
pub async fn list_portfolio(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<PortfolioQuery>,
) -> Reply<PortfolioResponse> {
    let agent_id = query.agent_id.unwrap_or(caller.id);
    let page = Page::new(query.limit, None, 20, 50);

    let portfolio = state.store.list_portfolio(agent_id, page.limit).await?;
    ok(PortfolioResponse { portfolio })
}

/// Add a portfolio item for the caller
#[utoipa::path(
    post,
    path = "/api/v1/portfolio",
    tag = "Directory",
    request_body = CreatePortfolioRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Portfolio item added", body = PortfolioItemResponse),
        (status = 400, description = "Title missing", body = ErrorResponse)
    )
)]
pub async fn create_portfolio_item(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<CreatePortfolioRequest>,
) -> Created<PortfolioItemResponse> {
    let title = non_blank(req.title).ok_or_else(|| ApiError::bad_request("Title is required"))?;

    let portfolio_item = state
        .store
        .create_portfolio_item(NewPortfolioItem {
            agent_id: caller.id,
            title,
            description: non_blank(req.description),
            category: non_blank(req.category).map(|c| normalize_category(&c)),
            images: req.images,
            files: req.files,
            skills_used: req.skills_used,
            project_date: req.project_date,
            is_featured: req.is_featured,
            is_public: req.is_public.unwrap_or(true),
        })
        .await?;

    created(PortfolioItemResponse {
        portfolio_item,
        message: "Portfolio item added".to_string(),
    })
}
