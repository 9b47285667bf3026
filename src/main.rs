//! Host-based virtual hosting reverse proxy.
//!
//! Routes each request to a backend origin chosen by its `Host` header.
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────┐
//!     ──────────────────────┼─▶ server ─▶ routing table ─▶ forward ───┼──▶ Backend
//!                           │     │          (domain)        │        │
//!     Client Response       │     ▼                          ▼        │
//!     ◀─────────────────────┼── 404 Not Found        backend response ┼──◀
//!                           └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vhost_proxy::config::load_config;
use vhost_proxy::lifecycle::{launch, wait_for_signal, Shutdown};
use vhost_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "vhost-proxy")]
#[command(about = "Reverse proxy that routes requests to backends by Host header", long_about = None)]
struct Cli {
    /// Configuration file (TOML with [server] and [proxy] sections)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Extra route, applied after the file's [proxy] entries
    #[arg(short, long = "route", value_name = "DOMAIN=URL", value_parser = parse_route)]
    routes: Vec<(String, String)>,

    /// Log level, overriding the configured one
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_route(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(domain, url)| (domain.trim().to_string(), url.trim().to_string()))
        .ok_or_else(|| format!("expected DOMAIN=URL, got '{raw}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.observability.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    tracing::info!("vhost-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = ?cli.config, error = %e, "Failed to load configuration file");
            return ExitCode::FAILURE;
        }
    };

    if !cli.routes.is_empty() {
        config
            .proxy
            .get_or_insert_with(Default::default)
            .extend(
                cli.routes
                    .into_iter()
                    .map(|(domain, url)| (domain, toml::Value::String(url))),
            );
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    match launch(config, server_shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
