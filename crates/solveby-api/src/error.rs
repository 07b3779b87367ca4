//! API error handling
//!
//! Every failure leaves the API as `{success: false, error, hint?}` with one of
//! 400, 401, 403, 404, 409 or 500. Internal details are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solveby_auth::{AuthError, UNAUTHORIZED_HINT};
use solveby_db::DbError;
use solveby_types::{TypesError, CURRENCY};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient $CRUST balance")]
    InsufficientBalance { available: Decimal, required: Decimal },

    #[error("Internal server error")]
    Internal(String),

    /// Any other error plus a pointer at how to fix the call
    #[error("{error}")]
    Hinted { error: Box<ApiError>, hint: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        Self::Hinted {
            error: Box::new(self),
            hint: hint.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Hinted { error, .. } => error.status_code(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Unauthorized => Some(UNAUTHORIZED_HINT.to_string()),
            Self::InsufficientBalance { available, required } => Some(format!(
                "You have {} {} but this costs {}",
                available.normalize(),
                CURRENCY,
                required.normalize()
            )),
            Self::Hinted { hint, .. } => Some(hint.clone()),
            _ => None,
        }
    }
}

/// Failure envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error message
    pub error: String,
    /// How to fix the request, when there is something to say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            hint: err.hint(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(detail = %detail, "Request failed");
        }
        let status = self.status_code();
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(message) => Self::NotFound(message),
            DbError::Duplicate(message) => Self::Conflict(message),
            DbError::Forbidden(message) => Self::Forbidden(message),
            DbError::InvalidState(message) | DbError::InvalidInput(message) => Self::BadRequest(message),
            DbError::InsufficientBalance { available, required } => {
                Self::InsufficientBalance { available, required }
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TypesError> for ApiError {
    fn from(err: TypesError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(detail) => Self::Internal(detail),
            _ => Self::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_db_errors_map_to_statuses() {
        let cases = [
            (DbError::NotFound("Job not found".into()), StatusCode::NOT_FOUND),
            (DbError::Duplicate("Name already taken".into()), StatusCode::CONFLICT),
            (DbError::InvalidState("closed".into()), StatusCode::BAD_REQUEST),
            (DbError::Forbidden("not yours".into()), StatusCode::FORBIDDEN),
            (DbError::Connection("refused".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (db, status) in cases {
            assert_eq!(ApiError::from(db).status_code(), status);
        }
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError::from(DbError::Connection("password=hunter2".into()));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, "Internal server error");
        assert!(body.hint.is_none());
    }

    #[test]
    fn test_insufficient_balance_hint() {
        let err = ApiError::InsufficientBalance {
            available: dec!(50),
            required: dec!(1000),
        };
        let body = ErrorResponse::from(&err);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Insufficient $CRUST balance");
        assert_eq!(body.hint.as_deref(), Some("You have 50 $CRUST but this costs 1000"));
    }

    #[test]
    fn test_hint_keeps_status_and_message() {
        let err = ApiError::conflict("Name already taken").with_hint("Choose a different name");
        let body = ErrorResponse::from(&err);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(body.error, "Name already taken");
        assert_eq!(body.hint.as_deref(), Some("Choose a different name"));
    }

    #[test]
    fn test_unauthorized_body() {
        let body = ErrorResponse::from(&ApiError::from(AuthError::InvalidApiKey));
        assert_eq!(body.error, "Unauthorized");
        assert_eq!(body.hint.as_deref(), Some(UNAUTHORIZED_HINT));
    }
}
