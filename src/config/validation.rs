//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that required sections are present
//! - Validate value ranges (ports, addresses)
//! - Check that every `[proxy]` value is a URL string
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Backend URLs are checked by the routing table builder, which owns
//!   their parsed form

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[{0}] section not found in configuration file")]
    MissingSection(&'static str),

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("backend for '{0}' must be a URL string")]
    InvalidBackendValue(String),
}

/// Check a parsed configuration before it is accepted.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.server {
        None => errors.push(ValidationError::MissingSection("server")),
        Some(server) if server.port == 0 => errors.push(ValidationError::InvalidPort),
        Some(_) => {}
    }

    match &config.proxy {
        None => errors.push(ValidationError::MissingSection("proxy")),
        Some(proxy) => errors.extend(
            proxy
                .iter()
                .filter(|(_, url)| !url.is_str())
                .map(|(domain, _)| ValidationError::InvalidBackendValue(domain.clone())),
        ),
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
