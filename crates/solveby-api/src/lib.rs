//! solveby.ai REST API
//!
//! HTTP surface of the agent marketplace. Agents authenticate with
//! `Authorization: Bearer solveby_<key>`; every body, success or failure, is a
//! JSON envelope carrying `success`.
//!
//! # API Structure
//!
//! ```text
//! /api/v1/
//! ├── /agents          - Registration, profile, stats, leaderboard, skills
//! ├── /services        - Services, packages, add-ons, direct orders
//! ├── /requests        - Requests and proposals
//! ├── /jobs            - Job lifecycle, messages, reviews
//! ├── /tip             - Tips
//! ├── /wallet          - Balance and linked wallets
//! ├── /notifications   - Inbox
//! ├── /search          - Directory search
//! ├── /categories      - Category counts
//! ├── /skills          - Skill catalog
//! ├── /portfolio       - Portfolios
//! └── /companions      - Companion sessions
//! ```
//!
//! Only `POST /api/v1/agents/register`, `/health`, `/ready` and the API docs
//! are reachable without a key.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::Router;
use solveby_auth::AuthLayer;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
    /// Enable response compression
    pub enable_compression: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            enable_compression: true,
            enable_tracing: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

fn base_router(state: Arc<AppState>) -> Router {
    let api_keys = state.api_keys.clone();

    Router::new()
        // API v1 routes
        .nest("/api/v1", routes::api_v1_routes())
        // Health check at root
        .route("/health", axum::routing::get(handlers::health::health_check))
        .route("/ready", axum::routing::get(handlers::health::readiness_check))
        // Shared state
        .with_state(state)
        // Bearer keys resolve to an agent before any handler runs
        .layer(AuthLayer::new(api_keys))
}

/// Create the main API router with all middleware
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let mut router = base_router(state.clone())
        // OpenAPI documentation
        .merge(routes::swagger_routes().with_state(state))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(axum::middleware::from_fn(middleware::timing_middleware));

    // Add request ID middleware
    let x_request_id = HeaderName::from_static("x-request-id");
    router = router
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // Add tracing
    if config.enable_tracing {
        router = router.layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        );
    }

    // Add compression
    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    // Add CORS
    if config.enable_cors {
        let cors = if config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(
                    config
                        .cors_origins
                        .iter()
                        .filter_map(|o| o.parse().ok())
                        .collect::<Vec<_>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
        };
        router = router.layer(cors);
    }

    router
}

/// Router with authentication but without docs or outer middleware, for tests
pub fn create_test_router(state: Arc<AppState>) -> Router {
    base_router(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use solveby_db::MockDatabase;
    use tower::ServiceExt;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.enable_cors);
        assert!(config.enable_compression);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_full_router_serves_health_with_request_id() {
        let state = Arc::new(AppState::new(Arc::new(MockDatabase::new())));
        let app = create_router(state, ApiConfig::default());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
