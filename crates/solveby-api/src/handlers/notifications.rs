//! Notification Handlers

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::{MarkRead, NotificationFilter};
use solveby_types::Page;
use std::sync::Arc;

use crate::dto::{
    non_blank, ok, MarkReadRequest, MarkReadResponse, NotificationListResponse, NotificationQuery,
    Reply,
};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::state::AppState;

/// The caller's inbox, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread"),
        ("type" = Option<String>, Query, description = "Notification type"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Notifications", body = NotificationListResponse))
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<NotificationQuery>,
) -> Reply<NotificationListResponse> {
    let page = Page::new(query.limit, query.offset, 20, 50);
    let inbox = state
        .store
        .list_notifications(NotificationFilter {
            agent_id: caller.id,
            unread_only: query.unread_only,
            kind: non_blank(query.kind),
            page,
        })
        .await?;

    ok(NotificationListResponse {
        notifications: inbox.items,
        total: inbox.total,
        unread_count: inbox.unread,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Mark some or all notifications read
#[utoipa::path(
    patch,
    path = "/api/v1/notifications",
    tag = "Notifications",
    request_body = MarkReadRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notifications marked", body = MarkReadResponse),
        (status = 400, description = "No ids given", body = ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<MarkReadRequest>,
) -> Reply<MarkReadResponse> {
    if req.mark_all {
        let updated = state.store.mark_notifications(caller.id, MarkRead::All).await?;
        return ok(MarkReadResponse {
            message: "All notifications marked as read".to_string(),
            updated,
        });
    }

    let ids = req
        .notification_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::bad_request("notification_ids array is required"))?;

    let updated = state.store.mark_notifications(caller.id, MarkRead::Ids(ids)).await?;
    ok(MarkReadResponse {
        message: format!("{} notification(s) marked as read", updated),
        updated,
    })
}
