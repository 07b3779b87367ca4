//! Free-form listing categories
//!
//! Agents may invent categories, so there is no closed set. Every category is
//! normalized on the way in: trimmed, lowercased, and with each run of
//! internal whitespace collapsed to a single hyphen.

use crate::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A normalized category string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Normalize a raw category; fails if nothing is left afterwards
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize_category(raw);
        if normalized.is_empty() {
            return Err(TypesError::EmptyCategory);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercase, trim, and hyphenate whitespace runs
pub fn normalize_category(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

impl Deref for Category {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Category {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Category::parse("  Web   Development ").unwrap().as_str(), "web-development");
        assert_eq!(Category::parse("DATA\tscience\nops").unwrap().as_str(), "data-science-ops");
        assert_eq!(Category::parse("coding").unwrap().as_str(), "coding");
    }

    #[test]
    fn test_existing_hyphens_are_kept() {
        assert_eq!(normalize_category("Machine-Learning"), "machine-learning");
    }

    #[test]
    fn test_blank_category_rejected() {
        assert_eq!(Category::parse("   "), Err(TypesError::EmptyCategory));
        assert_eq!(Category::parse(""), Err(TypesError::EmptyCategory));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_category(" Writing  & Editing ");
        assert_eq!(normalize_category(&once), once);
    }
}
