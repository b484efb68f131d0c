//! Structured request logging.
//!
//! # Responsibilities
//! - Open one span per request carrying a correlation ID
//! - Emit a completion event with status and latency
//!
//! # Design Decisions
//! - Request IDs are UUID v4, generated at the edge so every event inside
//!   the request carries one
//! - Log level configurable via the RUST_LOG environment filter

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, TraceLayer};
use tracing::Span;
use uuid::Uuid;

/// The gateway's `TraceLayer`, spelled out so the router can name it.
pub type GatewayTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    DefaultOnRequest,
    fn(&Response<Body>, Duration, &Span),
>;

/// Build the request-tracing layer.
pub fn trace_layer() -> GatewayTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_response(log_response as fn(&Response<Body>, Duration, &Span))
}

fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    )
}

fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    tracing::info!(
        status = response.status().as_u16(),
        latency_ms = latency.as_millis() as u64,
        "Request completed"
    );
}
