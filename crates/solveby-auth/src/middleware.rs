//! Bearer gate for Axum
//!
//! The layer resolves `Authorization: Bearer <key>` to an agent and stores an
//! [`AuthenticatedAgent`] in the request extensions. Requests without the
//! header pass through untouched so public routes keep working; handlers that
//! need an identity use the [`RequireAgent`] extractor. A header that is
//! present but wrong is rejected here with 401.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{error, warn};

use crate::api_key::{extract_bearer, ApiKeyService};
use crate::error::{AuthError, ErrorResponse};
use crate::types::AuthenticatedAgent;

#[derive(Clone)]
pub struct AuthLayer {
    api_keys: Arc<ApiKeyService>,
}

impl AuthLayer {
    pub fn new(api_keys: Arc<ApiKeyService>) -> Self {
        Self { api_keys }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            api_keys: self.api_keys.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    api_keys: Arc<ApiKeyService>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let api_keys = self.api_keys.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let auth_result = authenticate_request(req.headers(), &api_keys).await;

            match auth_result {
                Ok(agent) => {
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(agent);
                    inner.call(Request::from_parts(parts, body)).await
                }
                // No credentials: the handler decides whether that is fine
                Err(AuthError::Unauthenticated) => inner.call(req).await,
                Err(e) => {
                    if e.is_server_error() {
                        error!(error = %e, "Authentication lookup failed");
                    } else {
                        warn!(error = %e, path = %req.uri().path(), "Rejected bearer token");
                    }
                    Ok(auth_error_response(e))
                }
            }
        })
    }
}

async fn authenticate_request(
    headers: &axum::http::HeaderMap,
    api_keys: &ApiKeyService,
) -> Result<AuthenticatedAgent, AuthError> {
    let token = extract_bearer(headers)?.ok_or(AuthError::Unauthenticated)?;
    let agent = api_keys.authenticate(&token).await?;
    Ok(AuthenticatedAgent::from(&agent))
}

/// JSON 401/500 in the API envelope
pub fn auth_error_response(error: AuthError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(&error);

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

// =============================================================================
// Axum Extractors
// =============================================================================

/// Authenticated caller, or `None` on a public call
pub struct OptionalAgent(pub Option<AuthenticatedAgent>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAgent(parts.extensions.get::<AuthenticatedAgent>().cloned()))
    }
}

/// Authenticated caller; 401 otherwise
pub struct RequireAgent(pub AuthenticatedAgent);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAgent
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAgent>()
            .cloned()
            .map(RequireAgent)
            .ok_or_else(|| auth_error_response(AuthError::Unauthenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use rust_decimal_macros::dec;
    use solveby_db::{AgentStore, MockDatabase, NewAgent};
    use tower::ServiceExt;

    async fn whoami(RequireAgent(agent): RequireAgent) -> String {
        agent.name
    }

    async fn app() -> (Router, String) {
        let store = Arc::new(MockDatabase::new());
        let api_keys = Arc::new(ApiKeyService::new(store.clone()));
        let issued = api_keys.issue();
        store
            .register_agent(NewAgent {
                name: "gatekeeper".to_string(),
                description: None,
                api_key_hash: issued.key_hash,
                wallet_address: None,
                starting_balance: dec!(100),
            })
            .await
            .unwrap();

        let router = Router::new()
            .route("/me", get(whoami))
            .route("/public", get(|| async { "ok" }))
            .layer(AuthLayer::new(api_keys));
        (router, issued.api_key)
    }

    fn request(uri: &str, auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_key_reaches_handler() {
        let (router, key) = app().await;
        let response = router
            .oneshot(request("/me", Some(&format!("Bearer {}", key))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_header_is_401_on_protected_route() {
        let (router, _) = app().await;
        let response = router.oneshot(request("/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_header_passes_public_route() {
        let (router, _) = app().await;
        let response = router.oneshot(request("/public", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_rejected() {
        for auth in ["Bearer nope", "Token abc", "Bearer solveby_0000000000000000000000000000000Z"] {
            let (router, _) = app().await;
            let response = router.oneshot(request("/public", Some(auth))).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{auth}");
        }
    }
}
