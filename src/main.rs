//! JWT-secured reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                     GATEWAY                       │
//!   Client Request    │  ┌─────────┐   ┌─────────┐   ┌──────┐   ┌───────┐ │
//!   ──────────────────┼─▶│ server  │──▶│ routing │──▶│ auth │──▶│forward│─┼──▶ Upstream
//!                     │  │(axum)   │   │snapshot │   │ JWT  │   │(hyper)│ │
//!   Client Response   │  └─────────┘   └─────────┘   └──────┘   └───┬───┘ │
//!   ◀─────────────────┼──────────────── relay ◀──────────────────────┘     │
//!                     │                                                   │
//!                     │  config watcher / SIGHUP ──▶ RouteStore (swap)    │
//!                     │  logging + metrics          lifecycle (signals)   │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use auth_gateway::config::watcher::ConfigWatcher;
use auth_gateway::config::{load_config, GatewayConfig};
use auth_gateway::lifecycle::{signals, Shutdown};
use auth_gateway::observability::{logging, metrics};
use auth_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "auth-gateway")]
#[command(about = "JWT-secured reverse-proxy gateway", long_about = None)]
struct Cli {
    /// Gateway configuration file (TOML).
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("auth-gateway: {}", e);
            return ExitCode::from(2);
        }
    };

    if cli.check {
        println!(
            "{}: OK ({} routes)",
            cli.config.display(),
            config.routes.len()
        );
        return ExitCode::SUCCESS;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auth-gateway starting");

    match serve(&cli.config, config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config_path: &Path, config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        issuer = %config.auth.issuer,
        audience = %config.auth.audience,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let shutdown = Shutdown::new();
    let (watcher, config_updates) =
        ConfigWatcher::new(config_path, config.routes_file.as_deref());
    let reload = watcher.handle();
    // Dropping the watcher stops it; keep it for the life of the server.
    let _watcher = watcher.run()?;

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));
    tokio::spawn(signals::reload_on_hangup(reload, shutdown.subscribe()));

    let bind_address = config.listener.bind_address.clone();
    let server = GatewayServer::new(config)?;
    let listener = TcpListener::bind(&bind_address).await?;

    server.run(listener, config_updates, shutdown.subscribe()).await?;
    Ok(())
}
