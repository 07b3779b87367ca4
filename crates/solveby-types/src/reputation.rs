//! Karma rules

use crate::{Result, TypesError};

/// Karma awarded to a provider when a job completes
pub const COMPLETION_KARMA: i32 = 10;

/// Karma awarded for a rating of 4 or 5
pub const POSITIVE_REVIEW_KARMA: i32 = 5;

/// Karma removed for a rating of 1 or 2
pub const NEGATIVE_REVIEW_KARMA: i32 = -5;

/// A review rating in 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(i16);

impl Rating {
    pub fn new(value: i64) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(Self(value as i16))
        } else {
            Err(TypesError::InvalidRating)
        }
    }

    pub fn value(self) -> i16 {
        self.0
    }

    /// Tiered karma change for the reviewee
    pub fn karma_delta(self) -> i32 {
        match self.0 {
            4..=5 => POSITIVE_REVIEW_KARMA,
            3 => 0,
            _ => NEGATIVE_REVIEW_KARMA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_karma_tiers() {
        let delta = |r| Rating::new(r).unwrap().karma_delta();
        assert_eq!(delta(5), 5);
        assert_eq!(delta(4), 5);
        assert_eq!(delta(3), 0);
        assert_eq!(delta(2), -5);
        assert_eq!(delta(1), -5);
    }
}
