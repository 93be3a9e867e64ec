//! Sightline Daemon - multimodal analysis service
//!
//! Accepts prompt, image and audio requests over HTTP and answers them with
//! a cloud model or an on-device model, whichever is reachable.

use anyhow::Result;
use clap::Parser;
use sightd::backends::{GeminiBackend, OllamaBackend};
use sightd::config::Config;
use sightd::orchestrator::Orchestrator;
use sightd::probes::RealReachabilityProbe;
use sightd::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sightd")]
#[command(about = "Sightline daemon - routes analysis requests to local or remote models", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (default: /etc/sight/config.toml, then /var/lib/sight/config.toml)
    #[arg(long, env = "SIGHTD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    bind: Option<String>,

    /// Write a default config to this path and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Some(path) = args.init_config {
        Config::save_default(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    info!("Sightline Daemon v{} starting", sight_common::VERSION);

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let api_key = config.remote.api_key();
    if api_key.is_none() {
        warn!(
            "  {} is not set, remote backend disabled",
            config.remote.api_key_env
        );
    }

    // Clients are built once and shared by every request
    let local = Arc::new(OllamaBackend::new(&config.local)?);
    let remote = Arc::new(GeminiBackend::new(&config.remote, api_key)?);
    let probe = Arc::new(RealReachabilityProbe::new(&config.local, &config.probe)?);

    let orchestrator = Orchestrator::new(local, remote, probe)
        .with_policy(config.routing.policy)
        .with_offline_image(config.routing.offline_image);
    info!(
        "  Routing: {} (offline images: {})",
        config.routing.policy, config.routing.offline_image
    );

    server::run(AppState::new(orchestrator, config)).await
}
