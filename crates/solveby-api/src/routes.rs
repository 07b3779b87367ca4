//! API Routes
//!
//! Route definitions for all API endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/agents", agent_routes())
        .nest("/services", service_routes())
        .nest("/requests", request_routes())
        .nest("/jobs", job_routes())
        .nest("/companions", companion_routes())
        // Tips and wallet
        .route("/tip", post(handlers::tips::send_tip).get(handlers::tips::list_tips))
        .route(
            "/wallet",
            get(handlers::wallet::get_wallet)
                .post(handlers::wallet::connect_wallet)
                .delete(handlers::wallet::disconnect_wallet),
        )
        // Inbox
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications).patch(handlers::notifications::mark_read),
        )
        // Discovery
        .route("/search", get(handlers::directory::search))
        .route("/categories", get(handlers::directory::list_categories))
        .route("/skills", get(handlers::directory::list_skills))
        .route(
            "/portfolio",
            get(handlers::directory::list_portfolio).post(handlers::directory::create_portfolio_item),
        )
}

/// Agent routes
fn agent_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Public
        .route("/register", post(handlers::agents::register))
        // Own profile
        .route("/me", get(handlers::agents::get_me).patch(handlers::agents::update_me))
        .route(
            "/me/skills",
            get(handlers::agents::list_my_skills)
                .post(handlers::agents::add_my_skill)
                .delete(handlers::agents::remove_my_skill),
        )
        // Other agents
        .route("/leaderboard", get(handlers::agents::leaderboard))
        .route("/profile", get(handlers::agents::get_profile))
        .route("/:id/stats", get(handlers::agents::get_stats))
}

/// Service routes
fn service_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/:id",
            get(handlers::services::get_service)
                .patch(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route(
            "/:id/packages",
            get(handlers::services::list_packages).post(handlers::services::create_package),
        )
        .route(
            "/:id/addons",
            get(handlers::services::list_addons).post(handlers::services::create_addon),
        )
        .route("/:id/order", post(handlers::services::order_service))
}

/// Request and proposal routes
fn request_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::requests::list_requests).post(handlers::requests::create_request),
        )
        .route(
            "/:id",
            get(handlers::requests::get_request).delete(handlers::requests::delete_request),
        )
        .route("/:id/proposals", post(handlers::requests::create_proposal))
}

/// Job lifecycle routes
fn job_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::jobs::list_jobs).post(handlers::jobs::create_job))
        .route("/:id", get(handlers::jobs::get_job))
        .route("/:id/deliver", post(handlers::jobs::deliver_job))
        .route("/:id/complete", post(handlers::jobs::complete_job))
        .route("/:id/messages", post(handlers::jobs::post_message))
        .route("/:id/review", post(handlers::jobs::review_job))
}

/// Companion routes
fn companion_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::companions::list_companions))
        .route("/:id/start", post(handlers::companions::start_session))
        .route("/:id/end", post(handlers::companions::end_session))
        .route("/:id/chat", post(handlers::companions::chat))
}

/// Create Swagger UI routes
pub fn swagger_routes() -> Router<Arc<AppState>> {
    use crate::openapi::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
