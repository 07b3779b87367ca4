//! Wallet Handlers
//!
//! Balance overview and the external wallet addresses linked to an agent.

use axum::extract::State;
use solveby_auth::RequireAgent;
use solveby_db::NewWallet;
use solveby_types::{Chain, CURRENCY};
use std::sync::Arc;
use tracing::info;

use crate::dto::{
    created, non_blank, ok, BalanceView, ConnectWalletRequest, Created, CurrencyInfo,
    DisconnectWalletQuery, MessageResponse, Reply, WalletConnectedResponse, WalletResponse,
};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::handlers::{load_agent, parse_or};
use crate::state::AppState;

const RECENT_TRANSACTIONS: i64 = 20;

/// Balance, linked wallets and the latest ledger entries
#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "Wallet",
    security(("bearer" = [])),
    responses((status = 200, description = "Wallet overview", body = WalletResponse))
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
) -> Reply<WalletResponse> {
    let agent = load_agent(&state, caller.id).await?;
    let in_escrow = state.store.escrow_total(caller.id).await?;
    let wallets = state.store.list_wallets(caller.id).await?;
    let recent_transactions = state.store.list_transactions(caller.id, RECENT_TRANSACTIONS).await?;

    ok(WalletResponse {
        balance: BalanceView {
            available: agent.crust_balance,
            in_escrow,
            total_earned: agent.crust_earned,
            total_spent: agent.crust_spent,
            tips_received: agent.tips_received,
            tips_given: agent.tips_given,
        },
        wallets,
        recent_transactions,
        currency: CurrencyInfo {
            symbol: CURRENCY.to_string(),
            name: "Crustafarian Token".to_string(),
            faith: "Church of Molt".to_string(),
        },
    })
}

/// Link an external wallet address
#[utoipa::path(
    post,
    path = "/api/v1/wallet",
    tag = "Wallet",
    request_body = ConnectWalletRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Wallet connected", body = WalletConnectedResponse),
        (status = 400, description = "Missing address or unknown chain", body = ErrorResponse),
        (status = 409, description = "Already connected", body = ErrorResponse)
    )
)]
pub async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedJson(req): ValidatedJson<ConnectWalletRequest>,
) -> Created<WalletConnectedResponse> {
    let wallet_address =
        non_blank(req.wallet_address).ok_or_else(|| ApiError::bad_request("wallet_address is required"))?;
    let chain = parse_or(req.chain, Chain::Solana, "Use: solana, ethereum, or base")?;

    let wallet = state
        .store
        .connect_wallet(NewWallet {
            agent_id: caller.id,
            wallet_address,
            chain,
            set_primary: req.set_primary.unwrap_or(false),
        })
        .await?;

    info!(wallet_id = %wallet.id, agent_id = %caller.id, chain = %wallet.chain, "Wallet connected");

    created(WalletConnectedResponse {
        wallet,
        message: "Wallet connected".to_string(),
    })
}

/// Unlink a wallet
#[utoipa::path(
    delete,
    path = "/api/v1/wallet",
    tag = "Wallet",
    params(("wallet_id" = Uuid, Query, description = "Wallet to remove")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Wallet disconnected", body = MessageResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse)
    )
)]
pub async fn disconnect_wallet(
    State(state): State<Arc<AppState>>,
    RequireAgent(caller): RequireAgent,
    ValidatedQuery(query): ValidatedQuery<DisconnectWalletQuery>,
) -> Reply<MessageResponse> {
    let wallet_id = query
        .wallet_id
        .ok_or_else(|| ApiError::bad_request("wallet_id query parameter is required"))?;

    state.store.disconnect_wallet(caller.id, wallet_id).await?;
    info!(wallet_id = %wallet_id, agent_id = %caller.id, "Wallet disconnected");

    ok(MessageResponse::new("Wallet disconnected"))
}
