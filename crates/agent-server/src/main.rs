//! NEAR agent HTTP Server
//!
//! Axum-based server providing REST API and WebSocket endpoints over the
//! tool-calling agent, with NEAR testnet tools registered.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, Config, ToolRegistry, WordTokenCounter};
use agent_runtime::provider_from_config;
use near_tools::{MockNearClient, NearClient, RpcNearClient, register_near_tools};

use crate::handlers::{chat_handler, chat_stream_handler, health_check};
use crate::state::AppState;

const DEFAULT_CONFIG_PATH: &str = "config/general.yaml";

/// Build the HTTP router over shared state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn near_client(config: &Config) -> Arc<dyn NearClient> {
    let near = &config.near;
    if near.mock {
        tracing::warn!("Using in-memory NEAR client (near.mock = true)");
        let account = if near.account_id.is_empty() {
            MockNearClient::default()
        } else {
            MockNearClient::new(near.account_id.clone())
        };
        Arc::new(account)
    } else {
        Arc::new(RpcNearClient::new(
            near.rpc_url.clone(),
            near.faucet_url.clone(),
            near.account_id.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("GENERAL_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = Config::load(&config_path)?;
    config.apply_env();

    // Initialize tracing
    let default_filter = if config.debug {
        "debug,hyper=warn,reqwest=warn"
    } else {
        "info,tower_http=debug"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(path = %config_path, "Loaded configuration");

    // Initialize LLM provider
    let provider = provider_from_config(&config)?;
    match provider.health_check().await {
        Ok(true) => tracing::info!(provider = provider.name(), "✓ Provider reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = provider.name(), "⚠ Provider not reachable - completions will fail");
        }
    }

    // Initialize tools
    let mut tools = ToolRegistry::new();
    let near = near_client(&config);
    register_near_tools(&mut tools, near.clone());

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }
    tracing::info!(client = near.name(), account = near.account_id(), "NEAR client ready");

    let agent = Agent::from_config(
        &config,
        provider.clone(),
        Arc::new(tools),
        Arc::new(WordTokenCounter),
    )?;

    let state = AppState {
        agent: Arc::new(agent),
        provider,
    };

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 NEAR agent server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  POST /api/chat        - Send message");
    tracing::info!("  GET  /api/chat/stream - WebSocket streaming");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
