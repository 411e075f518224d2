//! encore-rv (Review Service) - reviews, social graph and playlists
//!
//! Owns the datastore for the lifetime of the process: opened before the
//! server starts, closed after graceful shutdown. Listens on port 5781 by
//! default.

use anyhow::{Context, Result};
use clap::Parser;
use encore_common::config::TomlConfig;
use encore_common::storage::FsObjectStore;
use encore_common::store::{Datastore, SqliteStore};
use encore_common::upstream::{http_client, CatalogSource, ItunesCatalog};
use encore_rv::catalog::{ProxyCatalog, TrackLookup};
use encore_rv::{build_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for encore-rv
#[derive(Parser, Debug)]
#[command(name = "encore-rv")]
#[command(about = "Review service for Encore")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "ENCORE_RV_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "ENCORE_RV_BIND")]
    bind: String,

    /// Root folder holding the database and stored objects
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Call the catalog directly instead of through the search proxy
    #[arg(long, env = "ENCORE_DIRECT_UPSTREAM")]
    direct_upstream_access: Option<bool>,
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
        "Starting Encore Review Service (encore-rv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config.resolve_root_folder(args.root_folder.as_deref());
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let review = &config.review;
    let db_path = review.database_file(&root_folder);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );

    let storage_root = root_folder.join("storage");
    let objects = Arc::new(FsObjectStore::new(&storage_root, &review.public_storage_url));

    let client = http_client(Duration::from_secs(config.search.upstream_timeout_secs))
        .context("Failed to build HTTP client")?;
    let direct_upstream_access = args
        .direct_upstream_access
        .unwrap_or(review.direct_upstream_access);
    let direct: Option<Arc<dyn CatalogSource>> = if direct_upstream_access {
        info!("Catalog access: direct ({})", config.search.catalog_base_url);
        Some(Arc::new(ItunesCatalog::new(
            client.clone(),
            &config.search.catalog_base_url,
        )))
    } else {
        info!("Catalog access: via search proxy ({})", review.proxy_base_url);
        None
    };
    let tracks = TrackLookup::new(
        direct,
        Arc::new(ProxyCatalog::new(client, &review.proxy_base_url)),
    );

    let state = AppState::new(store.clone(), objects, tracks);
    let app = build_router(state).nest_service("/storage", ServeDir::new(&storage_root));

    let port = args.port.unwrap_or(review.port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("encore-rv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    served.context("Server error")?;

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
