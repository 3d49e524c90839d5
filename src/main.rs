//! Faucet service binary

use clap::Parser;
use core_faucet::api::{
    claim_coreid_handler, claim_handler, health_handler, kyc_callback_handler, root_handler,
    status_handler,
};
use core_faucet::{FaucetConfig, FaucetService, HttpKycGateway, JsonRpcChainClient, SledIdentityStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// RPC URL of the blockchain node
    #[arg(long)]
    rpc_url: Option<String>,

    /// Funding wallet address
    #[arg(long)]
    wallet: Option<String>,

    /// Cooldown between requests per key (minutes, <= 0 disables)
    #[arg(long)]
    cooldown_mins: Option<i64>,

    /// Dispatch queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Background drain interval (seconds)
    #[arg(long)]
    drain_interval: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let env_filter = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Core Faucet Service v0.1.0");

    // Load configuration
    let mut config = FaucetConfig::from_env();

    // Override with CLI arguments
    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = rpc_url;
    }

    if let Some(wallet) = args.wallet {
        config.wallet_address = wallet;
    }

    if let Some(mins) = args.cooldown_mins {
        config.cooldown_mins = mins;
    }

    if let Some(cap) = args.queue_capacity {
        config.queue_capacity = cap;
    }

    if let Some(secs) = args.drain_interval {
        config.drain_interval_secs = secs;
    }

    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Funding wallet: {}", config.wallet_address);
    info!("  Currency amount: {} ore", config.currency_amount);
    info!("  Token amount: {} CTN", config.token_amount);
    info!("  Cooldown: {} minutes", config.cooldown_mins);
    info!(
        "  Queue capacity: {}, drain every {}s",
        config.queue_capacity, config.drain_interval_secs
    );

    // Initialize collaborators
    let store = Arc::new(SledIdentityStore::open(&config.db_path)?);
    info!("Identity store initialized at: {}", config.db_path);

    let chain = Arc::new(JsonRpcChainClient::new(
        config.rpc_url.clone(),
        config.wallet_address.clone(),
        config.rpc_timeout(),
    )?);

    let kyc = Arc::new(HttpKycGateway::new(
        config.kyc_endpoint.clone(),
        config.kyc_api_key.clone(),
        config.rpc_timeout(),
    )?);

    // Create faucet service
    let drain_interval = config.drain_interval();
    let service = Arc::new(FaucetService::new(config.clone(), store, kyc, chain));
    info!("Faucet service initialized");

    // Start background drain actor
    service.dispatcher().spawn_drain(drain_interval);
    info!("Dispatch drain running every {:?}", drain_interval);

    // Build router
    let mut app = axum::Router::new()
        .route("/", axum::routing::get(root_handler))
        .route("/health", axum::routing::get(health_handler))
        .route("/status", axum::routing::get(status_handler))
        .route("/claim", axum::routing::post(claim_handler))
        .route("/claim/coreid", axum::routing::post(claim_coreid_handler))
        .route("/kyc/callback", axum::routing::post(kyc_callback_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service.clone());

    // Add CORS if enabled
    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        app = app.layer(cors);
        info!("CORS enabled");
    }

    // Start server
    let addr: SocketAddr = config.server_addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
