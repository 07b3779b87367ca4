//! API key issuance and lookup
//!
//! Keys look like `solveby_` followed by 32 ASCII alphanumerics. Only the
//! SHA-256 hex digest is stored; the plaintext is shown once at registration.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use solveby_db::{DbAgent, MarketStore};
use solveby_types::{is_well_formed_api_key, API_KEY_PREFIX, API_KEY_RANDOM_LEN};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Freshly issued key: the plaintext for the caller, the digest for storage
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub api_key: String,
    pub key_hash: String,
}

#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn MarketStore>,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Generate a new key and its storage digest
    pub fn issue(&self) -> IssuedKey {
        let api_key = generate_api_key();
        let key_hash = hash_api_key(&api_key);
        IssuedKey { api_key, key_hash }
    }

    /// Resolve a presented token to its agent
    ///
    /// Malformed tokens are rejected without touching the store. A match
    /// refreshes the agent's `last_active_at`.
    pub async fn authenticate(&self, token: &str) -> AuthResult<DbAgent> {
        if !is_well_formed_api_key(token) {
            return Err(AuthError::MalformedApiKey);
        }

        let agent = self
            .store
            .find_agent_by_key_hash(&hash_api_key(token))
            .await?
            .ok_or(AuthError::InvalidApiKey)?;

        self.store.touch_agent(agent.id).await?;
        debug!(agent_id = %agent.id, "API key accepted");
        Ok(agent)
    }
}

/// `solveby_` plus 32 random alphanumerics
pub fn generate_api_key() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", API_KEY_PREFIX, random)
}

/// Hex SHA-256 of the key, the only form ever persisted
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// `Ok(None)` means no header at all; a header in any other shape is an error.
pub fn extract_bearer(headers: &HeaderMap) -> AuthResult<Option<String>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::MalformedApiKey)?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or(AuthError::MalformedApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_generated_keys_are_well_formed() {
        for _ in 0..50 {
            let key = generate_api_key();
            assert!(is_well_formed_api_key(&key), "{key}");
        }
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_api_key("solveby_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("solveby_abc"));
        assert_ne!(hash, hash_api_key("solveby_abd"));
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert!(matches!(extract_bearer(&headers), Ok(None)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer solveby_x"));
        assert_eq!(extract_bearer(&headers).unwrap().as_deref(), Some("solveby_x"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(matches!(extract_bearer(&headers), Err(AuthError::MalformedApiKey)));
    }

    #[tokio::test]
    async fn test_authenticate_against_store() {
        use rust_decimal_macros::dec;
        use solveby_db::{AgentStore, MockDatabase, NewAgent};

        let store = Arc::new(MockDatabase::new());
        let service = ApiKeyService::new(store.clone());
        let issued = service.issue();

        let agent = store
            .register_agent(NewAgent {
                name: "keyholder".to_string(),
                description: None,
                api_key_hash: issued.key_hash.clone(),
                wallet_address: None,
                starting_balance: dec!(100),
            })
            .await
            .unwrap();

        let resolved = service.authenticate(&issued.api_key).await.unwrap();
        assert_eq!(resolved.id, agent.id);

        let touched = store.find_agent(agent.id).await.unwrap().unwrap();
        assert!(touched.last_active_at.is_some());

        assert!(matches!(
            service.authenticate("solveby_short").await,
            Err(AuthError::MalformedApiKey)
        ));
        assert!(matches!(
            service.authenticate(&generate_api_key()).await,
            Err(AuthError::InvalidApiKey)
        ));
    }
}
