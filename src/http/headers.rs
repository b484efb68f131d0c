//! Header rewriting for the origin hop.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers, including those named by `Connection`
//! - Point `Host` at the origin
//! - Extend the `X-Forwarded-*` chain
//! - Carry upgrade handshakes across the hop
//!
//! # Design Decisions
//! - Scrubbing is idempotent; applying it twice changes nothing
//! - `X-Forwarded-Proto` and `X-Forwarded-Host` are only set when absent,
//!   so values from an outer proxy survive

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::AuthConfig;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers that must not survive a proxy hop (RFC 9110 section 7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Collect the header names listed in `Connection`, lowercased.
fn connection_directed(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Whether `Connection` carries the `upgrade` directive.
fn wants_upgrade(headers: &HeaderMap) -> bool {
    connection_directed(headers)
        .iter()
        .any(|token| token == "upgrade")
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in connection_directed(headers) {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Fold any existing `X-Forwarded-For` values into one comma-separated list
/// and append the connecting client's address.
fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    let client = client_ip.to_string();
    let prior: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let combined = if prior.is_empty() {
        client
    } else {
        format!("{}, {}", prior.join(", "), client)
    };
    if let Ok(value) = HeaderValue::from_str(&combined) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Rewrite inbound headers for the origin hop.
///
/// The inbound `Host` and the upgrade protocol are captured before the scrub;
/// when the request asks to upgrade, `Connection: Upgrade` and the original
/// `Upgrade` value are re-added afterwards so the handshake can traverse the
/// hop. Returns the requested upgrade protocol, if any.
pub fn prepare_forward_headers(
    headers: &mut HeaderMap,
    origin_host: &HeaderValue,
    client_ip: IpAddr,
    listener_https: bool,
    auth: &AuthConfig,
) -> Option<HeaderValue> {
    let inbound_host = headers.get(header::HOST).cloned();
    let upgrade_protocol = if wants_upgrade(headers) {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    };

    strip_hop_by_hop(headers);

    headers.insert(header::HOST, origin_host.clone());

    append_forwarded_for(headers, client_ip);

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        let proto = if listener_https { "https" } else { "http" };
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));
    }
    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = inbound_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    if !auth.forward_to_origin {
        headers.remove(&auth.header_name);
    }

    if let Some(protocol) = &upgrade_protocol {
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        headers.insert(header::UPGRADE, protocol.clone());
    }

    upgrade_protocol
}
