//! Jigna Server
//!
//! Serves a view of the demo models over HTTP with one bridge session per
//! WebSocket connection.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use jigna::config::Config;
use jigna::demo;
use jigna::resources::FileLoader;
use jigna::server::{AppState, create_router};
use jigna::view::View;

/// Jigna object bridge server
#[derive(Parser, Debug)]
#[command(name = "jigna")]
#[command(about = "Jigna object bridge server", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./jigna.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jigna server v{}", env!("CARGO_PKG_VERSION"));

    // Build the view over the demo context
    let mut view = View::from_config(&config.view);
    if view.body_html().is_empty() {
        view = view.with_body_html(demo::BODY_HTML);
    }
    for (name, value) in demo::context() {
        view = view.with_context(name, value);
    }

    let resources = FileLoader::new(&config.view.resources_root);
    info!("Serving resources from: {}", resources.root().display());

    // Create router
    let app = create_router(AppState::new(view, resources));

    // Start server
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
