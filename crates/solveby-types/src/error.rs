//! Error types for domain validation

use thiserror::Error;

/// Result type for domain validation
pub type Result<T> = std::result::Result<T, TypesError>;

/// Domain validation errors
///
/// Messages are phrased for API callers; the API layer forwards them verbatim
/// as 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    // ========================================================================
    // Identity Errors
    // ========================================================================

    /// Agent name does not match the allowed pattern
    #[error("Invalid name format")]
    InvalidName,

    // ========================================================================
    // Value Errors
    // ========================================================================

    /// Amount below the minimum or otherwise unusable
    #[error("{field} must be at least {minimum}")]
    AmountTooSmall { field: String, minimum: String },

    /// Category is empty after normalization
    #[error("Category must not be empty")]
    EmptyCategory,

    /// Delivery window too long to turn into a deadline
    #[error("Delivery time of {days} days is out of range")]
    DeadlineOutOfRange { days: i32 },

    /// Rating outside 1..=5
    #[error("Rating must be an integer between 1 and 5")]
    InvalidRating,

    /// A string did not match any variant of a text enum
    #[error("Invalid {kind}: {value}. Must be one of: {allowed}")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        allowed: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================

    /// Job state transition not permitted
    #[error("Cannot move job from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
