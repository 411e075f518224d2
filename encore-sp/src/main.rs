//! encore-sp (Search Proxy) - unified track search
//!
//! Stateless HTTP front for the music catalog and the social-audio provider.
//! Listens on port 5780 by default.

use anyhow::{Context, Result};
use clap::Parser;
use encore_common::config::TomlConfig;
use encore_common::upstream::{http_client, ItunesCatalog, SoundCloudEmbed};
use encore_sp::normalizer::SearchNormalizer;
use encore_sp::{build_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for encore-sp
#[derive(Parser, Debug)]
#[command(name = "encore-sp")]
#[command(about = "Search proxy for Encore")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "ENCORE_SP_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "ENCORE_SP_BIND")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Encore Search Proxy (encore-sp) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let search = &config.search;
    info!("Catalog: {}", search.catalog_base_url);
    info!("Social-audio provider: {}", search.embed_base_url);

    let client = http_client(Duration::from_secs(search.upstream_timeout_secs))
        .context("Failed to build HTTP client")?;
    let normalizer = SearchNormalizer::new(
        Arc::new(ItunesCatalog::new(client.clone(), &search.catalog_base_url)),
        Arc::new(SoundCloudEmbed::new(client, &search.embed_base_url)),
    );

    let app = build_router(AppState::new(normalizer));

    let port = args.port.unwrap_or(search.port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("encore-sp listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
