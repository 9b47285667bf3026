//! Backend origin representation.
//!
//! A backend is identified by scheme and authority only. Path, query and
//! fragment of the configured URL are dropped; forwarding never uses them.

use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

/// Reasons a backend URL string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("not an absolute URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("URL has no host")]
    MissingHost,

    #[error("unsupported scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("invalid authority '{0}'")]
    InvalidAuthority(String),
}

/// A parsed backend origin.
#[derive(Debug, Clone)]
pub struct Backend {
    scheme: Scheme,
    authority: Authority,
}

impl Backend {
    /// Parse an absolute `http`/`https` URL into a backend origin.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let url = Url::parse(raw.trim())?;

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(BackendError::MissingHost),
        };

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(BackendError::UnsupportedScheme(other.to_string())),
        };

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|_| BackendError::InvalidAuthority(authority))?;

        Ok(Self { scheme, authority })
    }

    /// Scheme used for the outbound request.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Host (and explicit port) used for the outbound request and its `Host` header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
