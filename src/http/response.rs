//! Response handling and transformation.
//!
//! # Responsibilities
//! - Scrub hop-by-hop headers from origin responses
//! - Stream the origin body to the client without buffering
//! - Keep the upgrade handshake headers intact on 101
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Mid-stream origin failures are logged and abort the client connection;
//!   the status line has already been sent by then

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::http::headers::strip_hop_by_hop;

/// Scrub hop-by-hop headers from an origin response.
///
/// On 101 the `Connection` and `Upgrade` pair is what the client needs to
/// complete the handshake, so it is re-added after the scrub.
pub fn sanitize_response_headers(headers: &mut HeaderMap, switching_protocols: bool) {
    let upgrade = if switching_protocols {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    };

    strip_hop_by_hop(headers);

    if switching_protocols {
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        if let Some(protocol) = upgrade {
            headers.insert(header::UPGRADE, protocol);
        }
    }
}

/// Convert an origin response into the client-facing response, streaming the
/// body as it arrives.
pub fn relay_response(upstream: Response<Incoming>) -> Response<Body> {
    let switching_protocols = upstream.status() == StatusCode::SWITCHING_PROTOCOLS;
    let (mut parts, body) = upstream.into_parts();

    sanitize_response_headers(&mut parts.headers, switching_protocols);

    let body = Body::new(body.map_err(|error| {
        tracing::warn!(error = %error, "Origin body stream failed mid-relay");
        error
    }));

    Response::from_parts(parts, body)
}
