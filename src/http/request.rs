//! Outbound request construction.
//!
//! # Responsibilities
//! - Derive the origin scheme, authority, and base path once at startup
//! - Rewrite each inbound request URI onto the origin
//! - Merge the origin's query string ahead of the client's
//!
//! # Design Decisions
//! - Per-request assembly is string concatenation into `http::Uri`; the
//!   inbound path and query are never decoded, so their percent-encoding
//!   reaches the origin byte for byte
//! - Boundary slashes collapse to exactly one at the join point

use axum::http::uri::{Authority, Scheme};
use axum::http::{HeaderValue, Uri};
use url::Url;

/// Precomputed pieces of the upstream origin, derived once at startup and
/// shared by every request.
#[derive(Debug, Clone)]
pub struct ForwardTarget {
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
    base_path: String,
    base_query: Option<String>,
}

impl ForwardTarget {
    /// Break the configured origin URL into its forwarding pieces.
    pub fn new(origin: &Url) -> Result<Self, axum::http::Error> {
        let scheme = if origin.scheme() == "https" {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };

        let mut authority = origin.host_str().unwrap_or_default().to_string();
        if let Some(port) = origin.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        let authority = Authority::try_from(authority.as_str())?;
        let host_header = HeaderValue::from_str(authority.as_str())?;

        Ok(Self {
            scheme,
            authority,
            host_header,
            base_path: origin.path().trim_end_matches('/').to_string(),
            base_query: origin.query().map(str::to_string),
        })
    }

    /// Whether the origin is reached over TLS.
    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::HTTPS
    }

    /// The origin's `host[:port]`, as sent in the `Host` header.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// The origin authority, for log fields.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite an inbound request URI onto the origin.
    ///
    /// The origin's base path is prepended with exactly one `/` at the join;
    /// its query string, when present, goes ahead of the client's.
    pub fn forward_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = match inbound.path() {
            "" => "/",
            path => path,
        };

        let mut path_and_query = format!("{}{}", self.base_path, path);
        match (self.base_query.as_deref(), inbound.query()) {
            (Some(base), Some(query)) => {
                path_and_query.push('?');
                path_and_query.push_str(base);
                path_and_query.push('&');
                path_and_query.push_str(query);
            }
            (Some(base), None) => {
                path_and_query.push('?');
                path_and_query.push_str(base);
            }
            (None, Some(query)) => {
                path_and_query.push('?');
                path_and_query.push_str(query);
            }
            (None, None) => {}
        }

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}
