//! Custom Axum Extractors
//!
//! Every rejection here is rendered in the API error envelope, so malformed
//! bodies, query strings and path ids never fall back to axum's plain-text
//! responses.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

// =============================================================================
// Validated Query Extractor
// =============================================================================

/// Query extractor with validation
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + validator::Validate,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                error_response(ApiError::bad_request("Invalid query parameters").with_hint(e.body_text()))
            })?;

        value
            .validate()
            .map_err(|e| error_response(ApiError::BadRequest(format_validation_errors(&e))))?;

        Ok(ValidatedQuery(value))
    }
}

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// JSON extractor with validation
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + validator::Validate,
{
    type Rejection = Response;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| {
                error_response(ApiError::bad_request("Invalid request body").with_hint(e.body_text()))
            })?;

        value
            .validate()
            .map_err(|e| error_response(ApiError::BadRequest(format_validation_errors(&e))))?;

        Ok(ValidatedJson(value))
    }
}

/// JSON body that may be omitted entirely; an empty body yields `T::default()`
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<S, T> axum::extract::FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + validator::Validate,
{
    type Rejection = Response;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            error_response(ApiError::bad_request("Invalid request body").with_hint(e.body_text()))
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            error_response(ApiError::bad_request("Invalid request body").with_hint(e.to_string()))
        })?;

        value
            .validate()
            .map_err(|e| error_response(ApiError::BadRequest(format_validation_errors(&e))))?;

        Ok(OptionalJson(value))
    }
}

// =============================================================================
// Path Id Extractor
// =============================================================================

/// The `:id` segment of a route, parsed as a UUID
pub struct PathId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| error_response(ApiError::bad_request("Invalid id").with_hint("Ids are UUIDs")))?;
        Ok(PathId(id))
    }
}

// =============================================================================
// Request ID Extractor
// =============================================================================

/// Extract request ID from headers
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(RequestId(request_id))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Create error response from ApiError
pub fn error_response(error: ApiError) -> Response {
    error.into_response()
}

/// Format validation errors into a readable string
pub(crate) fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "title is required"))]
        title: String,
        #[validate(range(min = 1))]
        days: i32,
    }

    #[test]
    fn test_validation_messages() {
        let sample = Sample {
            title: String::new(),
            days: 0,
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(format_validation_errors(&errors), "days is invalid, title is required");
    }

    #[test]
    fn test_valid_sample_passes() {
        let sample = Sample {
            title: "ok".into(),
            days: 2,
        };
        assert!(sample.validate().is_ok());
    }
}
