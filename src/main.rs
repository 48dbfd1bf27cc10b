//! Asteroid Arena Server - authoritative multiplayer game server
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket connections for login, input and subscriptions
//! - A fixed-rate authoritative tick broadcasting world snapshots
//! - The project selection side feed with root access
//! - A health endpoint for monitoring

mod app;
mod config;
mod game;
mod http;
mod projects;
mod session;
mod util;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::WorldState;
use crate::http::build_router;
use crate::projects::ProjectCatalog;
use crate::session::{ConnectionRegistry, PlayerDirectory, SessionGateway};
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Asteroid Arena Server");
    info!("Server address: {}", config.server_addr);
    info!(
        "World: {}x{} (seed {})",
        config.world_width, config.world_height, config.world_seed
    );

    // Session core components
    let registry = Arc::new(ConnectionRegistry::new());
    let directory = Arc::new(PlayerDirectory::new());
    let world = WorldState::new(config.world_width, config.world_height, config.world_seed);
    let projects = ProjectCatalog::new(config.root_password.clone());

    let (gateway, gateway_handle) =
        SessionGateway::new(registry.clone(), directory.clone(), world, projects);

    // Spawn the gateway event loop; the repeating broadcast tick lives
    // inside it and is the only cancellable unit
    let gateway_task = tokio::spawn(gateway.run());

    let state = AppState::new(config.clone(), registry, directory, gateway_handle);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gateway_task.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
