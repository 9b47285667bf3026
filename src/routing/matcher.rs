//! Host extraction for route lookup.
//!
//! # Responsibilities
//! - Read the virtual host a request targets
//! - Reduce it to the bare domain used as routing key
//!
//! # Design Decisions
//! - Matching is exact and case-sensitive
//! - Everything from the first `:` is discarded, so a port never
//!   takes part in the lookup
//! - A missing host yields the empty domain, which matches nothing

use axum::http::{header, Request};

/// The host a request targets, exactly as the client sent it.
///
/// Reads the `Host` header, falling back to the URI authority for
/// HTTP/2 requests which carry `:authority` instead.
pub fn request_host<B>(req: &Request<B>) -> Option<&str> {
    match req.headers().get(header::HOST) {
        Some(value) => value.to_str().ok(),
        None => req.uri().authority().map(|a| a.as_str()),
    }
}

/// Strip the port (and anything else after the first `:`) from a host.
pub fn domain_of(host: &str) -> &str {
    match host.split_once(':') {
        Some((domain, _)) => domain,
        None => host,
    }
}
