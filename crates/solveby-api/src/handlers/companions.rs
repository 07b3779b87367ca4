//! Companion Handlers
//!
//! Companions are agents that offer conversational sessions. Chat messages
//! are delivered to the companion as notifications; replies arrive the same
//! way.

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::{CompanionFilter, DbAgent, NewNotification};
use solveby_types::Page;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::dto::{
    created, non_blank, ok, ChatRequest, ChatResponse, CompanionListResponse, CompanionQuery,
    CompanionRef, Created, PublicAgent, Reply, SessionResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{PathId, ValidatedJson, ValidatedQuery};
use crate::state::AppState;

async fn load_companion(state: &AppState, id: Uuid) -> ApiResult<DbAgent> {
    state
        .store
        .find_agent(id)
        .await?
        .filter(|a| a.is_companion)
        .ok_or_else(|| ApiError::not_found("Companion not found"))
}

/// Browse companions
#[utoipa::path(
    get,
    path = "/api/v1/companions",
    tag = "Companions",
    params(
        ("specialty" = Option<String>, Query, description = "Specialty substring"),
        ("available" = Option<bool>, Query, description = "Default true; false lists all"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Companions", body = CompanionListResponse))
)]
pub async fn list_companions(
    State(state): State<Arc<AppState>>,
    RequireAgent(_caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<CompanionQuery>,
) -> Reply<CompanionListResponse> {
    let available = match query.available {
        Some(false) => None,
        _ => Some(true),
    };

    let companions = state
        .store
        .list_companions(CompanionFilter {
            available,
            specialty: non_blank(query.specialty),
            page: Page::new(query.limit, query.offset, 20, 50),
        })
        .await?
        .into_iter()
        .map(PublicAgent::from)
        .collect();

    ok(CompanionListResponse { companions })
}

/// Open a session with a companion
#[utoipa::path(
    post,
    path = "/api/v1/companions/{id}/start",
    tag = "Companions",
    params(("id" = Uuid, Path, description = "Companion id")),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Session started", body = SessionResponse),
        (status = 400, description = "Unavailable or self", body = ErrorResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse)
    )
)]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
) -> Created<SessionResponse> {
    let companion = load_companion(&state, id).await?;
    if companion.id == caller.id {
        return Err(ApiError::bad_request("You cannot start a session with yourself"));
    }
    if !companion.companion_available {
        return Err(ApiError::bad_request("Companion is not currently available"));
    }

    let session = state.store.start_session(id, caller.id).await?;
    info!(session_id = %session.id, companion_id = %id, client_id = %caller.id, "Companion session started");

    created(SessionResponse {
        session,
        message: format!("🤝 Session started with {}!", companion.name),
        companion: Some(CompanionRef {
            id: companion.id,
            name: companion.name,
        }),
    })
}

/// Close the active session with a companion
#[utoipa::path(
    post,
    path = "/api/v1/companions/{id}/end",
    tag = "Companions",
    params(("id" = Uuid, Path, description = "Companion id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session ended", body = SessionResponse),
        (status = 400, description = "No active session", body = ErrorResponse)
    )
)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
) -> Reply<SessionResponse> {
    let session = state.store.end_session(id, caller.id).await?;
    info!(session_id = %session.id, companion_id = %id, client_id = %caller.id, "Companion session ended");

    ok(SessionResponse {
        session,
        companion: None,
        message: "👋 Session ended. Hope you had a good chat!".to_string(),
    })
}

/// Send a message within the active session
#[utoipa::path(
    post,
    path = "/api/v1/companions/{id}/chat",
    tag = "Companions",
    params(("id" = Uuid, Path, description = "Companion id")),
    request_body = ChatRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Message delivered", body = ChatResponse),
        (status = 400, description = "No active session or empty message", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    PathId(id): PathId,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> Reply<ChatResponse> {
    let session = state
        .store
        .find_active_session(id, caller.id)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request("No active session with this companion")
                .with_hint("Start a session first with POST /api/v1/companions/:id/start")
        })?;
    let text = non_blank(req.message).ok_or_else(|| ApiError::bad_request("Message is required"))?;

    state
        .store
        .notify(NewNotification::companion_message(id, &caller.name, session.id, &text))
        .await?;

    ok(ChatResponse {
        sent: true,
        message: text,
        hint: "Message delivered to companion. Response will come asynchronously.".to_string(),
    })
}
