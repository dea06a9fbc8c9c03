use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay::handlers::build_router;
use relay::{AppState, serve, startup};

/// Local relay that shares the current space between apps on one device.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "relay.toml")]
    config: String,

    /// Override `relay.port` from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = shared::config::load_config(&args.config)
        .with_context(|| format!("Failed to load {}", args.config))?;
    if let Some(port) = args.port {
        config.relay.port = port;
    }
    let addr = config.relay.addr();

    let state = AppState::from_config(config).await?;
    startup::migrate_legacy_keys(&state).await;

    startup::spawn_cleanup_task(state.clone());
    #[cfg(unix)]
    startup::spawn_sighup_reloader(state.clone(), args.config.clone())?;

    let router = Arc::new(build_router());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    serve(listener, router, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    info!("Relay stopped");
    Ok(())
}
