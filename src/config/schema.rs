//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! Values arrive as environment variable strings; the loader parses them into
//! these typed fields so the rest of the system never re-parses.

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

/// Root configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// The single origin all authorized requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Shared-secret authentication settings.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: SocketAddr,

    /// Optional TLS configuration. The listener terminates TLS when set.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream origin configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Absolute URL of the origin. A base path here is prepended to every
    /// forwarded request path; a query string here is merged ahead of the
    /// client's query.
    pub origin: Url,
}

/// Shared-secret authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Name of the request header carrying the secret.
    pub header_name: HeaderName,

    /// Expected header value, compared byte-exact.
    pub header_value: HeaderValue,

    /// Forward the auth header to the origin. When false the gateway strips
    /// it after the check and the secret never leaves this hop.
    pub forward_to_origin: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Origin connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the origin to produce response headers, in seconds.
    /// Body streaming is not bounded by this.
    pub response_header_secs: u64,

    /// Drain window granted to in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_header_secs: 30,
            shutdown_grace_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Prometheus exporter bind address. Metrics are disabled when unset.
    pub metrics_address: Option<SocketAddr>,
}
