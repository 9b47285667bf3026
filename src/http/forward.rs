//! Forwarding requests to a single backend origin.
//!
//! # Responsibilities
//! - Rewrite an inbound request so it targets the resolved backend
//! - Send it with the platform HTTP client and stream the response back
//! - Map transport failures to proxy status codes
//! - Keep the upgrade handshake intact so `101` exchanges can be tunneled
//!
//! # Design Decisions
//! - The rewrite is shared; `Forward` implementations only move bytes
//! - Only scheme and authority change; path and query pass through untouched
//! - No retries: a failed exchange is reported to the client once

use std::future::Future;
use std::mem;
use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderValue, InvalidHeaderValue};
use axum::http::uri::{InvalidUriParts, PathAndQuery};
use axum::http::{Request, Response, StatusCode, Uri, Version};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::headers::{append_forwarded_for, remove_hop_by_hop, X_FORWARDED_HOST};
use crate::http::websocket::{restore_upgrade_headers, upgrade_type, UpgradeError};
use crate::routing::Backend;

/// Failure while handing a request to its backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build outbound URI: {0}")]
    InvalidUri(#[from] InvalidUriParts),

    #[error("cannot build outbound header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("cannot tunnel upgraded connection: {0}")]
    Upgrade(#[from] UpgradeError),
}

impl ForwardError {
    /// Status code reported to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            ForwardError::InvalidHeader(_)
            | ForwardError::Upstream(_)
            | ForwardError::Upgrade(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Capability to deliver an already rewritten request to its backend.
///
/// The request URI is absolute and names the backend. Implementations
/// return the backend response as-is; header cleanup happens in the caller.
pub trait Forward: Send + Sync + 'static {
    fn forward(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send;
}

/// Point `request` at `backend`.
///
/// Sets scheme and authority, replaces `Host` with the backend authority,
/// records the original host in `X-Forwarded-Host` and appends `client`
/// to `X-Forwarded-For`. An upgrade request keeps its `Connection` and
/// `Upgrade` headers.
pub fn rewrite_request(
    request: Request<Body>,
    backend: &Backend,
    client: Option<IpAddr>,
) -> Result<Request<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    let original_host = match parts.headers.get(header::HOST) {
        Some(host) => Some(host.clone()),
        None => parts
            .uri
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok()),
    };

    let mut uri_parts = mem::take(&mut parts.uri).into_parts();
    uri_parts.scheme = Some(backend.scheme().clone());
    uri_parts.authority = Some(backend.authority().clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = Uri::from_parts(uri_parts)?;
    parts.version = Version::HTTP_11;

    let upgrade = upgrade_type(&parts.headers);
    remove_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = upgrade {
        restore_upgrade_headers(&mut parts.headers, protocol);
    }
    parts
        .headers
        .insert(header::HOST, HeaderValue::from_str(backend.authority().as_str())?);
    if let Some(host) = original_host {
        parts.headers.insert(X_FORWARDED_HOST, host);
    }
    if let Some(client) = client {
        append_forwarded_for(&mut parts.headers, client);
    }

    Ok(Request::from_parts(parts, body))
}

/// Strip connection-scoped headers from a backend response.
///
/// A `101 Switching Protocols` keeps the protocol it switched to.
pub fn into_client_response(response: Response<Body>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    let switched = match parts.status {
        StatusCode::SWITCHING_PROTOCOLS => parts.headers.get(header::UPGRADE).cloned(),
        _ => None,
    };
    remove_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = switched {
        restore_upgrade_headers(&mut parts.headers, protocol);
    }
    Response::from_parts(parts, body)
}

/// `Forward` over hyper's pooled client, speaking `http` and `https`.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    upstream_timeout: Option<Duration>,
}

impl HyperForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(timeouts.connect_secs.map(Duration::from_secs));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Self {
            client,
            upstream_timeout: timeouts.upstream_secs.map(Duration::from_secs),
        }
    }
}

impl Forward for HyperForwarder {
    fn forward(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send {
        let client = self.client.clone();
        let upstream_timeout = self.upstream_timeout;

        async move {
            let pending = client.request(request);
            let response = match upstream_timeout {
                Some(limit) => tokio::time::timeout(limit, pending)
                    .await
                    .map_err(|_| ForwardError::Timeout(limit))??,
                None => pending.await?,
            };
            Ok(response.map(Body::new))
        }
    }
}
