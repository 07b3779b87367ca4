//! API Handlers
//!
//! Request handlers for all API endpoints. Handlers validate first and only
//! then call into the store, so a rejected call never writes.

pub mod agents;
pub mod companions;
pub mod directory;
pub mod health;
pub mod jobs;
pub mod notifications;
pub mod requests;
pub mod services;
pub mod tips;
pub mod wallet;

use solveby_db::DbAgent;
use solveby_types::{Category, TypesError};
use std::str::FromStr;
use uuid::Uuid;

use crate::dto::non_blank;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Fresh row for an agent, 404 if it vanished
pub(crate) async fn load_agent(state: &AppState, id: Uuid) -> ApiResult<DbAgent> {
    state
        .store
        .find_agent(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agent not found"))
}

/// Parse an optional enum parameter, falling back to `default` when absent
pub(crate) fn parse_or<T>(raw: Option<String>, default: T, hint: &str) -> ApiResult<T>
where
    T: FromStr<Err = TypesError>,
{
    match non_blank(raw) {
        Some(value) => value
            .parse()
            .map_err(|e: TypesError| ApiError::from(e).with_hint(hint)),
        None => Ok(default),
    }
}

/// Parse an optional enum filter; absent stays absent
pub(crate) fn parse_filter<T>(raw: Option<String>, hint: &str) -> ApiResult<Option<T>>
where
    T: FromStr<Err = TypesError>,
{
    non_blank(raw)
        .map(|value| value.parse().map_err(|e: TypesError| ApiError::from(e).with_hint(hint)))
        .transpose()
}

/// Normalize an optional category filter
pub(crate) fn category_filter(raw: Option<String>) -> ApiResult<Option<Category>> {
    non_blank(raw).map(|c| Category::parse(&c).map_err(ApiError::from)).transpose()
}

/// Round to `places` decimals for display
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use solveby_types::{Chain, Urgency};

    #[test]
    fn test_parse_or_defaults_and_hints() {
        assert_eq!(parse_or(None, Urgency::Medium, "").unwrap(), Urgency::Medium);
        assert_eq!(parse_or(Some(" ".into()), Chain::Solana, "").unwrap(), Chain::Solana);
        assert_eq!(parse_or(Some("high".into()), Urgency::Medium, "").unwrap(), Urgency::High);

        let err = parse_or::<Chain>(Some("dogechain".into()), Chain::Solana, "Use: solana, ethereum, or base")
            .unwrap_err();
        assert_eq!(err.hint().as_deref(), Some("Use: solana, ethereum, or base"));
    }

    #[test]
    fn test_category_filter() {
        assert!(category_filter(None).unwrap().is_none());
        assert_eq!(
            category_filter(Some("Web  Dev".into())).unwrap().unwrap().as_str(),
            "web-dev"
        );
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.6666, 2), 66.67);
        assert_eq!(round_to(4.25, 1), 4.3);
    }
}
