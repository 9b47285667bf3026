//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener with graceful shutdown
//! - Resolve each request's domain against the routing table
//! - Forward matched requests, answer 404 for the rest
//! - Hand `101 Switching Protocols` exchanges to the upgrade tunnel

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper::upgrade::OnUpgrade;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::{into_client_response, rewrite_request, Forward, HyperForwarder};
use crate::http::request::{request_id, request_id_layer};
use crate::http::websocket::{accept_upgrade, upgrade_type};
use crate::observability::metrics;
use crate::routing::{domain_of, request_host, RouteError, RoutingTable};

/// Application state injected into handlers.
pub struct AppState<F> {
    pub routes: Arc<RoutingTable>,
    pub forwarder: Arc<F>,
}

impl<F> AppState<F> {
    pub fn new(routes: RoutingTable, forwarder: F) -> Self {
        Self {
            routes: Arc::new(routes),
            forwarder: Arc::new(forwarder),
        }
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            forwarder: self.forwarder.clone(),
        }
    }
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Build the routing table from `config.proxy` and create the server.
    ///
    /// Fails on the first malformed backend URL.
    pub fn from_config(config: ProxyConfig) -> Result<Self, RouteError> {
        let routes = RoutingTable::build(config.route_pairs())?;
        tracing::info!(routes = routes.len(), "Routing table ready");
        Ok(Self::new(config, routes))
    }

    /// Create a server over an already built routing table.
    pub fn new(config: ProxyConfig, routes: RoutingTable) -> Self {
        let forwarder = HyperForwarder::new(&config.timeouts);
        let router = build_router(AppState::new(routes, forwarder));
        Self { router, config }
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
///
/// Every path and method goes to the dispatch handler.
pub fn build_router<F: Forward>(state: AppState<F>) -> Router {
    Router::new()
        .fallback(proxy_handler::<F>)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}

/// Main proxy handler.
/// Looks up the request's domain and forwards it or answers 404.
async fn proxy_handler<F: Forward>(
    State(state): State<AppState<F>>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let domain = domain_of(request_host(&request).unwrap_or_default()).to_string();

    tracing::info!(
        request_id = %request_id,
        domain = %domain,
        url = %request.uri(),
        method = %request.method(),
        "Received request"
    );

    let Some(backend) = state.routes.lookup(&domain) else {
        tracing::warn!(request_id = %request_id, domain = %domain, "No route for domain");
        metrics::record_request(metrics::UNMATCHED, 404, start_time);
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let upgrade = upgrade_type(request.headers());
    let client_upgrade = match upgrade {
        Some(_) => request.extensions_mut().remove::<OnUpgrade>(),
        None => None,
    };

    let result = match rewrite_request(request, backend, client) {
        Ok(outbound) => state.forwarder.forward(outbound).await,
        Err(e) => Err(e),
    };
    let result = result.and_then(|response| {
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Ok(response);
        }
        tracing::debug!(request_id = %request_id, domain = %domain, "Switching protocols");
        Ok(accept_upgrade(upgrade.as_ref(), client_upgrade, response)?)
    });

    match result {
        Ok(response) => {
            metrics::record_request(&domain, response.status().as_u16(), start_time);
            into_client_response(response)
        }
        Err(e) => {
            let status = e.status();
            tracing::error!(
                request_id = %request_id,
                domain = %domain,
                backend = %backend,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&domain, status.as_u16(), start_time);
            let reason = status.canonical_reason().unwrap_or("Bad Gateway");
            (status, reason).into_response()
        }
    }
}
