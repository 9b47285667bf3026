//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Build the domain → backend table from configuration pairs
//! - Look up the backend for a request domain
//! - Return the matched backend or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) domain lookup via HashMap
//! - Any bad entry aborts the whole build; there is no partial table

use std::collections::HashMap;

use thiserror::Error;

use crate::routing::backend::{Backend, BackendError};

/// Error raised while building the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Failed to parse URL for key {domain}: {source}")]
    InvalidBackend {
        domain: String,
        url: String,
        #[source]
        source: BackendError,
    },

    #[error("empty domain mapped to {url}")]
    EmptyDomain { url: String },

    #[error("domain '{domain}' contains ':' and can never match (ports are not part of the key)")]
    DomainWithPort { domain: String },
}

/// Immutable mapping from bare domain to backend origin.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Backend>,
}

impl RoutingTable {
    /// Build a table from `(domain, backend URL)` pairs.
    ///
    /// Later pairs replace earlier ones with the same domain.
    pub fn build<I, D, U>(pairs: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (D, U)>,
        D: AsRef<str>,
        U: AsRef<str>,
    {
        let mut routes = HashMap::new();

        tracing::info!("Reverse proxy mapping table:");
        for (domain, url) in pairs {
            let (domain, url) = (domain.as_ref(), url.as_ref());

            if domain.is_empty() {
                return Err(RouteError::EmptyDomain { url: url.to_string() });
            }
            if domain.contains(':') {
                return Err(RouteError::DomainWithPort { domain: domain.to_string() });
            }

            let backend = Backend::parse(url).map_err(|source| RouteError::InvalidBackend {
                domain: domain.to_string(),
                url: url.to_string(),
                source,
            })?;

            tracing::info!(domain = %domain, backend = %backend, "{} => {}", domain, backend);

            if routes.insert(domain.to_string(), backend).is_some() {
                tracing::warn!(domain = %domain, "Duplicate domain, later entry wins");
            }
        }

        let table = Self { routes };
        if table.is_empty() {
            tracing::warn!("Routing table is empty; every request will receive 404");
        }

        Ok(table)
    }

    /// Find the backend for a bare domain.
    pub fn lookup(&self, domain: &str) -> Option<&Backend> {
        self.routes.get(domain)
    }

    /// Number of distinct domains.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
