//! Shared-secret request authentication.
//!
//! Every inbound request must carry the configured header with the configured
//! value. Anything else is terminated here with a 401; the origin never sees
//! unauthorized traffic.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::AuthConfig;
use crate::http::server::AppState;

/// Middleware gating requests on the configured shared-secret header.
pub async fn require_shared_secret(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !authorized(request.headers(), &state.config.auth) {
        return (StatusCode::UNAUTHORIZED, "unauthorized request").into_response();
    }
    next.run(request).await
}

/// Whether the request presents the expected secret.
///
/// Only the first value of the header is considered when a client sends
/// several.
pub(crate) fn authorized(headers: &HeaderMap, auth: &AuthConfig) -> bool {
    match headers.get(&auth.header_name) {
        Some(presented) => constant_time_eq(presented.as_bytes(), auth.header_value.as_bytes()),
        None => false,
    }
}

/// Compare two byte strings without an early exit on the first differing
/// byte. A length mismatch returns immediately; only the match outcome is
/// observable through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
