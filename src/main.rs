use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{error, info};

use sumo_arena_server::config::ServerConfig;
use sumo_arena_server::lobby::bot_rooms;
use sumo_arena_server::lobby::manager::LobbyManager;
use sumo_arena_server::metrics::Metrics;
use sumo_arena_server::net::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging: RUST_LOG env var wins, fallback is "info"
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Sumo Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    info!(
        "Configuration loaded: {}:{}",
        config.bind_address, config.port
    );
    match &config.bot_token {
        Some(_) => info!("Chat-bot integration enabled, webapp: {}", config.webapp_url),
        None => info!("BOT_TOKEN not set, chat-bot integration disabled"),
    }

    // Initialize shared state
    let metrics = Arc::new(Metrics::new());
    let lobby = Arc::new(RwLock::new(LobbyManager::new()));

    // Keep a pool of joinable bot rooms around
    bot_rooms::spawn(lobby.clone(), metrics.clone());

    let app = routes::router(AppState { lobby, metrics });

    let listener = TcpListener::bind((config.bind_address, config.port)).await?;
    info!(
        "Server ready on http://{}:{}",
        config.bind_address, config.port
    );

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    // Run server with graceful shutdown
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Server stopped");

    Ok(())
}
