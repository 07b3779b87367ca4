//! Authentication error types
//!
//! Every failure the gate can produce collapses to a 401 on the wire, except
//! store failures which are internal. The client never learns which check
//! failed.

use serde::{Deserialize, Serialize};
use solveby_db::DbError;
use thiserror::Error;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Hint attached to every 401
pub const UNAUTHORIZED_HINT: &str = "Include Authorization: Bearer YOUR_API_KEY header";

#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header on a route that needs one
    #[error("Authentication required")]
    Unauthenticated,

    /// Header present but not `Bearer solveby_<32 alphanumerics>`
    #[error("Malformed API key")]
    MalformedApiKey,

    /// Well-formed key that matches no agent
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Database error: {0}")]
    Database(String),
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated | Self::MalformedApiKey | Self::InvalidApiKey => 401,
            Self::Database(_) => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        Self::Database(err.to_string())
    }
}

/// Wire body for gate rejections, same envelope as the API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&AuthError> for ErrorResponse {
    fn from(error: &AuthError) -> Self {
        if error.is_server_error() {
            return Self {
                success: false,
                error: "Internal server error".to_string(),
                hint: None,
            };
        }

        Self {
            success: false,
            error: "Unauthorized".to_string(),
            hint: Some(UNAUTHORIZED_HINT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Unauthenticated.status_code(), 401);
        assert_eq!(AuthError::MalformedApiKey.status_code(), 401);
        assert_eq!(AuthError::InvalidApiKey.status_code(), 401);
        assert_eq!(AuthError::Database("down".into()).status_code(), 500);
    }

    #[test]
    fn test_rejections_share_one_body() {
        let malformed = ErrorResponse::from(&AuthError::MalformedApiKey);
        let unknown = ErrorResponse::from(&AuthError::InvalidApiKey);

        assert!(!malformed.success);
        assert_eq!(malformed.error, "Unauthorized");
        assert_eq!(malformed.error, unknown.error);
        assert_eq!(malformed.hint.as_deref(), Some(UNAUTHORIZED_HINT));
    }

    #[test]
    fn test_store_failure_does_not_leak() {
        let body = ErrorResponse::from(&AuthError::Database("connection refused".into()));
        assert_eq!(body.error, "Internal server error");
        assert!(body.hint.is_none());
    }
}
