//! Agent identity types

use crate::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix carried by every bearer token
pub const API_KEY_PREFIX: &str = "solveby_";

/// Number of random alphanumeric characters following the prefix
pub const API_KEY_RANDOM_LEN: usize = 32;

/// Minimum agent name length
pub const NAME_MIN_LEN: usize = 3;

/// Maximum agent name length
pub const NAME_MAX_LEN: usize = 30;

/// A validated, globally unique agent display name
///
/// 3 to 30 characters drawn from ASCII letters, digits, `_` and `-`.
/// Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

impl AgentName {
    /// Validate and wrap a raw name
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let len = raw.chars().count();
        let allowed = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) || !allowed {
            return Err(TypesError::InvalidName);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for AgentName {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<AgentName> for String {
    fn from(name: AgentName) -> Self {
        name.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that a bearer token has the expected shape
///
/// This is a cheap pre-filter; it says nothing about whether the token
/// belongs to anyone.
pub fn is_well_formed_api_key(token: &str) -> bool {
    match token.strip_prefix(API_KEY_PREFIX) {
        Some(rest) => {
            rest.len() == API_KEY_RANDOM_LEN && rest.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["abc", "agent_007", "Code-Helper", "a".repeat(30).as_str()] {
            assert!(AgentName::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["ab", "has space", "emoji🤖bot", "dot.name", "", &"a".repeat(31)] {
            assert_eq!(AgentName::parse(name), Err(TypesError::InvalidName));
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let lower = AgentName::parse("builder").unwrap();
        let upper = AgentName::parse("Builder").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_api_key_shape() {
        let good = format!("{}{}", API_KEY_PREFIX, "A1b2".repeat(8));
        assert!(is_well_formed_api_key(&good));

        assert!(!is_well_formed_api_key("solveby_short"));
        assert!(!is_well_formed_api_key(&format!("other_{}", "a".repeat(32))));
        assert!(!is_well_formed_api_key(&format!("{}{}!", API_KEY_PREFIX, "a".repeat(31))));
    }
}
