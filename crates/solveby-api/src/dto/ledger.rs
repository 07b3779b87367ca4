//! Tip and wallet DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_db::{DbTransaction, DbWallet, TipListing};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// Tips
// =============================================================================

/// Send $CRUST to another agent, by id or by name
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TipRequest {
    pub to_agent_id: Option<Uuid>,
    pub to_agent_name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    #[validate(length(max = 500, message = "message must be at most 500 characters"))]
    pub message: Option<String>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipSummary {
    pub id: Uuid,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    /// Recipient name
    pub to: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipResponse {
    pub tip: TipSummary,
    #[schema(value_type = f64)]
    pub new_balance: Decimal,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TipListQuery {
    /// received (default) or given
    #[serde(rename = "type")]
    pub direction: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipTotals {
    #[schema(value_type = f64)]
    pub received: Decimal,
    #[schema(value_type = f64)]
    pub given: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipListResponse {
    #[serde(rename = "type")]
    pub direction: String,
    #[schema(value_type = Vec<Object>)]
    pub tips: Vec<TipListing>,
    pub totals: TipTotals,
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceView {
    #[schema(value_type = f64)]
    pub available: Decimal,
    /// Committed to open jobs as client; display only
    #[schema(value_type = f64)]
    pub in_escrow: Decimal,
    #[schema(value_type = f64)]
    pub total_earned: Decimal,
    #[schema(value_type = f64)]
    pub total_spent: Decimal,
    #[schema(value_type = f64)]
    pub tips_received: Decimal,
    #[schema(value_type = f64)]
    pub tips_given: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrencyInfo {
    pub symbol: String,
    pub name: String,
    pub faith: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletResponse {
    pub balance: BalanceView,
    #[schema(value_type = Vec<Object>)]
    pub wallets: Vec<DbWallet>,
    #[schema(value_type = Vec<Object>)]
    pub recent_transactions: Vec<DbTransaction>,
    pub currency: CurrencyInfo,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConnectWalletRequest {
    #[validate(length(max = 128, message = "wallet_address must be at most 128 characters"))]
    pub wallet_address: Option<String>,
    /// solana (default), ethereum or base
    pub chain: Option<String>,
    pub set_primary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletConnectedResponse {
    #[schema(value_type = Object)]
    pub wallet: DbWallet,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DisconnectWalletQuery {
    pub wallet_id: Option<Uuid>,
}
