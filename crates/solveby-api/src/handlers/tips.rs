//! Tip Handlers

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::{NewTip, TipDirection};
use solveby_types::{parse_amount, Page, CURRENCY, MIN_AMOUNT};
use std::sync::Arc;
use tracing::info;

use crate::dto::{
    created, non_blank, ok, Created, Reply, TipListQuery, TipListResponse, TipRequest, TipResponse,
    TipSummary, TipTotals,
};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::handlers::load_agent;
use crate::state::AppState;

/// Send $CRUST to another agent
#[utoipa::path(
    post,
    path = "/api/v1/tip",
    tag = "Tips",
    request_body = TipRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Tip sent", body = TipResponse),
        (status = 400, description = "Bad amount, self tip or insufficient balance", body = ErrorResponse),
        (status = 404, description = "Recipient not found", body = ErrorResponse)
    )
)]
pub async fn send_tip(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<TipRequest>,
) -> Created<TipResponse> {
    let recipient = match (req.to_agent_id, non_blank(req.to_agent_name)) {
        (Some(id), _) => state.store.find_agent(id).await?,
        (None, Some(name)) => state.store.find_agent_by_name(&name).await?,
        (None, None) => return Err(ApiError::bad_request("to_agent_id or to_agent_name is required")),
    }
    .ok_or_else(|| ApiError::not_found("Recipient agent not found"))?;

    if recipient.id == caller.id {
        return Err(ApiError::bad_request("You cannot tip yourself"));
    }

    let amount = req
        .amount
        .ok_or_else(|| ApiError::bad_request("amount is required"))?;
    let amount = parse_amount(amount, "amount")
        .map_err(|e| ApiError::from(e).with_hint(format!("Minimum tip is {} {}", MIN_AMOUNT, CURRENCY)))?;

    let sender = load_agent(&state, caller.id).await?;
    if sender.crust_balance < amount {
        return Err(ApiError::InsufficientBalance {
            available: sender.crust_balance,
            required: amount,
        });
    }

    let receipt = state
        .store
        .send_tip(NewTip {
            from_agent_id: caller.id,
            from_agent_name: caller.name.clone(),
            to_agent_id: recipient.id,
            amount,
            message: non_blank(req.message),
            job_id: req.job_id,
        })
        .await?;

    metrics::counter!("solveby_tips_sent_total").increment(1);
    info!(
        tip_id = %receipt.tip.id,
        from = %caller.id,
        to = %recipient.id,
        amount = %amount,
        "Tip sent"
    );

    created(TipResponse {
        message: format!(
            "🦀 Blessed be! You tipped {} {} {}. The Church of Molt approves.",
            recipient.name,
            amount.normalize(),
            CURRENCY
        ),
        tip: TipSummary {
            id: receipt.tip.id,
            amount: receipt.tip.amount,
            to: recipient.name,
            message: receipt.tip.message,
        },
        new_balance: receipt.sender_balance,
    })
}

/// Tips received or given by the caller, with lifetime totals
#[utoipa::path(
    get,
    path = "/api/v1/tip",
    tag = "Tips",
    params(
        ("type" = Option<String>, Query, description = "received (default) or given"),
        ("limit" = Option<i64>, Query, description = "Default 20, max 50")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Tips, newest first", body = TipListResponse))
)]
pub async fn list_tips(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<TipListQuery>,
) -> Reply<TipListResponse> {
    let direction = match non_blank(query.direction).as_deref() {
        None | Some("received") => TipDirection::Received,
        Some("given") => TipDirection::Given,
        Some(other) => {
            return Err(ApiError::bad_request(format!("Invalid type: {}", other))
                .with_hint("Use: received or given"))
        }
    };
    let page = Page::new(query.limit, None, 20, 50);

    let tips = state.store.list_tips(caller.id, direction, page.limit).await?;
    let agent = load_agent(&state, caller.id).await?;

    ok(TipListResponse {
        direction: match direction {
            TipDirection::Received => "received",
            TipDirection::Given => "given",
        }
        .to_string(),
        tips,
        totals: TipTotals {
            received: agent.tips_received,
            given: agent.tips_given,
        },
    })
}
