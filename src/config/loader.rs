//! Configuration loading from the environment.

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{
    AuthConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig, TlsConfig,
    UpstreamConfig,
};
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_TARGET_URL: &str = "RP_TARGET_URL";
pub const ENV_PORT: &str = "RP_PORT";
pub const ENV_HEADER_KEY: &str = "RP_HEADER_KEY";
pub const ENV_HEADER_KEY_VAL: &str = "RP_HEADER_KEY_VAL";
pub const ENV_FORWARD_AUTH_HEADER: &str = "RP_FORWARD_AUTH_HEADER";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "RP_CONNECT_TIMEOUT_SECS";
pub const ENV_RESPONSE_HEADER_TIMEOUT_SECS: &str = "RP_RESPONSE_HEADER_TIMEOUT_SECS";
pub const ENV_SHUTDOWN_GRACE_SECS: &str = "RP_SHUTDOWN_GRACE_SECS";
pub const ENV_TLS_CERT: &str = "RP_TLS_CERT";
pub const ENV_TLS_KEY: &str = "RP_TLS_KEY";
pub const ENV_METRICS_ADDR: &str = "RP_METRICS_ADDR";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    Missing(&'static str),
    /// A variable is present but cannot be parsed.
    Invalid(&'static str, String),
    /// Semantic validation rejected the loaded values.
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "missing required environment variable {}", var),
            ConfigError::Invalid(var, reason) => write!(f, "invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from process environment variables.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    load_with(|name| std::env::var(name).ok())
}

/// Load configuration through an arbitrary variable source.
///
/// Unset and empty variables are treated the same way.
pub fn load_with<F>(lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let origin_raw = require(&lookup, ENV_TARGET_URL)?;
    let origin = Url::parse(&origin_raw)
        .map_err(|e| ConfigError::Invalid(ENV_TARGET_URL, e.to_string()))?;

    let listen_raw = require(&lookup, ENV_PORT)?;
    let bind_address = normalize_listen_addr(&listen_raw).ok_or_else(|| {
        ConfigError::Invalid(ENV_PORT, format!("cannot interpret {:?} as a listen address", listen_raw))
    })?;

    let header_name_raw = require(&lookup, ENV_HEADER_KEY)?;
    let header_name = HeaderName::try_from(header_name_raw.as_str())
        .map_err(|e| ConfigError::Invalid(ENV_HEADER_KEY, e.to_string()))?;

    let header_value_raw = require(&lookup, ENV_HEADER_KEY_VAL)?;
    let header_value = HeaderValue::try_from(header_value_raw.as_str())
        .map_err(|e| ConfigError::Invalid(ENV_HEADER_KEY_VAL, e.to_string()))?;

    let forward_to_origin = match optional(&lookup, ENV_FORWARD_AUTH_HEADER) {
        None => true,
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| ConfigError::Invalid(ENV_FORWARD_AUTH_HEADER, format!("expected true or false, got {:?}", raw)))?,
    };

    let defaults = TimeoutConfig::default();
    let timeouts = TimeoutConfig {
        connect_secs: parse_secs(&lookup, ENV_CONNECT_TIMEOUT_SECS, defaults.connect_secs)?,
        response_header_secs: parse_secs(
            &lookup,
            ENV_RESPONSE_HEADER_TIMEOUT_SECS,
            defaults.response_header_secs,
        )?,
        shutdown_grace_secs: parse_secs(&lookup, ENV_SHUTDOWN_GRACE_SECS, defaults.shutdown_grace_secs)?,
    };

    // Half a TLS pair is a deployment mistake, not a request for plain HTTP.
    let tls = match (optional(&lookup, ENV_TLS_CERT), optional(&lookup, ENV_TLS_KEY)) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig { cert_path, key_path }),
        (None, None) => None,
        (Some(_), None) => return Err(ConfigError::Missing(ENV_TLS_KEY)),
        (None, Some(_)) => return Err(ConfigError::Missing(ENV_TLS_CERT)),
    };

    let metrics_address = match optional(&lookup, ENV_METRICS_ADDR) {
        None => None,
        Some(raw) => Some(
            raw.parse::<SocketAddr>()
                .map_err(|e| ConfigError::Invalid(ENV_METRICS_ADDR, e.to_string()))?,
        ),
    };

    let config = GatewayConfig {
        listener: ListenerConfig { bind_address, tls },
        upstream: UpstreamConfig { origin },
        auth: AuthConfig {
            header_name,
            header_value,
            forward_to_origin,
        },
        timeouts,
        observability: ObservabilityConfig { metrics_address },
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_secs<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid(name, e.to_string())),
    }
}

/// Interpret the configured listen address.
///
/// Accepts a full `host:port`, a bare port, or the `:port` shorthand; the
/// short forms bind every interface.
fn normalize_listen_addr(raw: &str) -> Option<SocketAddr> {
    let raw = raw.trim();
    let candidate = if let Some(port) = raw.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("0.0.0.0:{}", raw)
    } else {
        raw.to_string()
    };
    candidate.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_TARGET_URL, "http://127.0.0.1:9000/base"),
            (ENV_PORT, ":8080"),
            (ENV_HEADER_KEY, "X-ContentKey"),
            (ENV_HEADER_KEY_VAL, "s3cret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<GatewayConfig, ConfigError> {
        load_with(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_loads_minimal_env() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.listener.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.upstream.origin.as_str(), "http://127.0.0.1:9000/base");
        assert_eq!(config.auth.header_name.as_str(), "x-contentkey");
        assert_eq!(config.auth.header_value.as_bytes(), b"s3cret");
        assert!(config.auth.forward_to_origin);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.timeouts.response_header_secs, 30);
        assert!(config.observability.metrics_address.is_none());
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = base_env();
        env.remove(ENV_TARGET_URL);
        match load(&env) {
            Err(ConfigError::Missing(var)) => assert_eq!(var, ENV_TARGET_URL),
            other => panic!("expected Missing, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = base_env();
        env.insert(ENV_HEADER_KEY_VAL, "");
        assert!(matches!(load(&env), Err(ConfigError::Missing(ENV_HEADER_KEY_VAL))));
    }

    #[test]
    fn test_rejects_unparseable_origin() {
        let mut env = base_env();
        env.insert(ENV_TARGET_URL, "not a url");
        assert!(matches!(load(&env), Err(ConfigError::Invalid(ENV_TARGET_URL, _))));
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let mut env = base_env();
        env.insert(ENV_HEADER_KEY, "bad header name");
        assert!(matches!(load(&env), Err(ConfigError::Invalid(ENV_HEADER_KEY, _))));
    }

    #[test]
    fn test_forward_flag_parsing() {
        let mut env = base_env();
        env.insert(ENV_FORWARD_AUTH_HEADER, "false");
        assert!(!load(&env).unwrap().auth.forward_to_origin);

        env.insert(ENV_FORWARD_AUTH_HEADER, "1");
        assert!(load(&env).unwrap().auth.forward_to_origin);

        env.insert(ENV_FORWARD_AUTH_HEADER, "yes");
        assert!(matches!(load(&env), Err(ConfigError::Invalid(ENV_FORWARD_AUTH_HEADER, _))));
    }

    #[test]
    fn test_timeout_overrides() {
        let mut env = base_env();
        env.insert(ENV_CONNECT_TIMEOUT_SECS, "2");
        env.insert(ENV_RESPONSE_HEADER_TIMEOUT_SECS, "7");
        let config = load(&env).unwrap();
        assert_eq!(config.timeouts.connect_secs, 2);
        assert_eq!(config.timeouts.response_header_secs, 7);
    }

    #[test]
    fn test_half_configured_tls_pair() {
        let mut env = base_env();
        env.insert(ENV_TLS_CERT, "/etc/gateway/cert.pem");
        assert!(matches!(load(&env), Err(ConfigError::Missing(ENV_TLS_KEY))));
    }

    #[test]
    fn test_empty_optional_counts_as_unset() {
        let mut env = base_env();
        env.insert(ENV_FORWARD_AUTH_HEADER, "");
        env.insert(ENV_TLS_CERT, "");
        env.insert(ENV_TLS_KEY, "");
        let config = load(&env).unwrap();
        assert!(config.auth.forward_to_origin);
        assert!(config.listener.tls.is_none());
    }

    #[test]
    fn test_normalize_listen_addr_forms() {
        assert_eq!(
            normalize_listen_addr("8080").unwrap().to_string(),
            "0.0.0.0:8080"
        );
        assert_eq!(
            normalize_listen_addr(":9001").unwrap().to_string(),
            "0.0.0.0:9001"
        );
        assert_eq!(
            normalize_listen_addr("127.0.0.1:3000").unwrap().to_string(),
            "127.0.0.1:3000"
        );
        assert!(normalize_listen_addr("").is_none());
        assert!(normalize_listen_addr("not-an-address").is_none());
    }
}
