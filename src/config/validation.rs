//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntactic)
//! - Check the origin URL is a usable forward target
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::GatewayConfig;

/// A single rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Check the assembled configuration for semantic problems.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let origin = &config.upstream.origin;
    match origin.scheme() {
        "http" | "https" => {}
        other => errors.push(ValidationError {
            field: "upstream.origin",
            reason: format!("unsupported scheme {:?}, expected http or https", other),
        }),
    }
    if origin.host_str().is_none() {
        errors.push(ValidationError {
            field: "upstream.origin",
            reason: "origin URL has no host".to_string(),
        });
    }

    if config.auth.header_value.is_empty() {
        errors.push(ValidationError {
            field: "auth.header_value",
            reason: "expected header value must not be empty".to_string(),
        });
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.connect_secs",
            reason: "must be greater than zero".to_string(),
        });
    }
    if config.timeouts.response_header_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.response_header_secs",
            reason: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
