//! Application state shared across handlers

use rust_decimal::Decimal;
use solveby_auth::ApiKeyService;
use solveby_db::MarketStore;
use solveby_types::STARTING_BALANCE;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Marketplace persistence
    pub store: Arc<dyn MarketStore>,
    /// API key issuance and lookup
    pub api_keys: Arc<ApiKeyService>,
    /// $CRUST credited to every new agent
    pub starting_balance: Decimal,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        let api_keys = Arc::new(ApiKeyService::new(store.clone()));
        Self {
            store,
            api_keys,
            starting_balance: STARTING_BALANCE,
        }
    }

    pub fn with_starting_balance(mut self, amount: Decimal) -> Self {
        self.starting_balance = amount;
        self
    }
}
