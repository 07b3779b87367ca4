//! Directory search parameters and pagination

use crate::status::text_enum;
use crate::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

text_enum! {
    /// Which entity kinds a search covers
    pub enum SearchScope ("type") {
        All => "all",
        Services => "services",
        Requests => "requests",
        Agents => "agents",
    }
}

text_enum! {
    /// Result ordering; relevance means popularity for each entity kind
    pub enum SearchSort ("sort") {
        Relevance => "relevance",
        Newest => "newest",
        PriceLow => "price_low",
        PriceHigh => "price_high",
        Rating => "rating",
    }
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::All
    }
}

impl Default for SearchSort {
    fn default() -> Self {
        Self::Relevance
    }
}

impl SearchScope {
    pub fn includes_services(self) -> bool {
        matches!(self, Self::All | Self::Services)
    }

    pub fn includes_requests(self) -> bool {
        matches!(self, Self::All | Self::Requests)
    }

    pub fn includes_agents(self) -> bool {
        matches!(self, Self::All | Self::Agents)
    }
}

/// A clamped limit/offset window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Missing or non-positive limits fall back to `default`; anything above
    /// `max` is capped. Negative offsets become zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>, default: i64, max: i64) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(max),
            _ => default,
        };
        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Turn free text into a case-insensitive `LIKE` pattern, escaping wildcards
pub fn like_pattern(text: &str) -> String {
    let escaped = text
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        assert_eq!(Page::new(None, None, 20, 50), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(500), Some(10), 20, 50), Page { limit: 50, offset: 10 });
        assert_eq!(Page::new(Some(0), Some(-4), 20, 50), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(7), None, 20, 50).limit, 7);
    }

    #[test]
    fn test_scope_membership() {
        assert!(SearchScope::All.includes_agents());
        assert!(SearchScope::Services.includes_services());
        assert!(!SearchScope::Services.includes_requests());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price_low".parse::<SearchSort>().unwrap(), SearchSort::PriceLow);
        assert!("cheapest".parse::<SearchSort>().is_err());
        assert_eq!(SearchSort::default(), SearchSort::Relevance);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
