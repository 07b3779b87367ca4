//! API Middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Requests slower than this are logged at warn
pub const SLOW_REQUEST_MS: u128 = 1000;

/// Request timing middleware
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let elapsed = start.elapsed();

    if elapsed.as_millis() > SLOW_REQUEST_MS {
        tracing::warn!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            "Slow request detected"
        );
    } else {
        tracing::debug!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            status = response.status().as_u16(),
            "Request completed"
        );
    }

    response
}
