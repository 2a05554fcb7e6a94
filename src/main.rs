use std::net::SocketAddr;
use std::sync::Arc;

use smobilpay_backend::api::{self, AppState};
use smobilpay_backend::config::Config;
use smobilpay_backend::database::repository::TransactionStore;
use smobilpay_backend::database::transaction_repository::TransactionRepository;
use smobilpay_backend::database::{self, PoolConfig};
use smobilpay_backend::gateway::client::SmobilpayClient;
use smobilpay_backend::notification::reconcile::ReconciliationEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Log startup info
    tracing::info!("Starting SmobilPay backend");
    tracing::info!("Environment: {}", config.smobilpay.environment);
    if config.smobilpay.webhook_secret.is_none() {
        tracing::warn!(
            "No webhook secret configured, webhook signature verification is disabled"
        );
    }

    // Connect to the database
    let pool_config = PoolConfig {
        max_connections: config.database.max_connections,
        ..Default::default()
    };
    let pool = database::init_pool(&config.database.url, Some(pool_config)).await?;

    // Wire up the application state
    let store: Arc<dyn TransactionStore> = Arc::new(TransactionRepository::new(pool));
    let gateway = Arc::new(SmobilpayClient::new(config.smobilpay.clone())?);
    tracing::info!("SmobilPay API URL: {}", gateway.api_url());
    let engine = Arc::new(ReconciliationEngine::new(store.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        engine,
        gateway,
    };

    // Build router
    let app = api::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
