//! Protocol upgrade proxying (WebSocket and friends).
//!
//! # Responsibilities
//! - Detect upgrade requests (`Connection: upgrade` plus `Upgrade`)
//! - Carry the upgrade headers across hop-by-hop cleanup
//! - Splice client and backend connections after `101 Switching Protocols`
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Byte-level forwarding: frames are never parsed or buffered
//! - The backend decides whether to switch; any other status is an ordinary response
//! - Either side closing ends the tunnel for both

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use thiserror::Error;

/// Failure to turn a `101` backend response into a tunnel.
#[derive(Debug, Error, PartialEq)]
pub enum UpgradeError {
    #[error("backend switched protocols without an upgrade request")]
    NotRequested,

    #[error("backend switched to {offered:?} but client asked for {requested:?}")]
    ProtocolMismatch { requested: String, offered: String },

    #[error("connection cannot be upgraded")]
    Unavailable,
}

/// Protocol the client asks to switch to, if `Connection` names `upgrade`.
pub fn upgrade_type(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    if wants_upgrade {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    }
}

/// Put back the two headers that announce an upgrade.
pub fn restore_upgrade_headers(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Accept a backend's `101` and tunnel the two connections once both switch.
///
/// `requested` is the protocol from the client request and `client` its
/// pending upgrade. The returned response is relayed to the client; the
/// tunnel starts after hyper has written it.
pub fn accept_upgrade(
    requested: Option<&HeaderValue>,
    client: Option<OnUpgrade>,
    mut response: Response<Body>,
) -> Result<Response<Body>, UpgradeError> {
    let requested = requested.ok_or(UpgradeError::NotRequested)?;

    let offered = response.headers().get(header::UPGRADE);
    if !offered.is_some_and(|offered| offered.as_bytes().eq_ignore_ascii_case(requested.as_bytes())) {
        return Err(UpgradeError::ProtocolMismatch {
            requested: String::from_utf8_lossy(requested.as_bytes()).into_owned(),
            offered: offered
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default(),
        });
    }

    let client = client.ok_or(UpgradeError::Unavailable)?;
    let backend = response
        .extensions_mut()
        .remove::<OnUpgrade>()
        .ok_or(UpgradeError::Unavailable)?;

    tokio::spawn(tunnel(client, backend));
    Ok(response)
}

async fn tunnel(client: OnUpgrade, backend: OnUpgrade) {
    let (client, backend) = match tokio::try_join!(client, backend) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "Connection upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut backend = TokioIo::new(backend);

    match tokio::io::copy_bidirectional(&mut client, &mut backend).await {
        Ok((to_backend, to_client)) => {
            tracing::debug!(to_backend, to_client, "Upgraded connection closed");
        }
        Err(e) => tracing::debug!(error = %e, "Upgraded connection ended with error"),
    }
}
