use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use mnfp_advisor::routes::{router, AppState};
use mnfp_advisor::{ConversationAdvisor, GatewayConfig, GeminiClient, GenerativeModelGateway, HistoryMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = GatewayConfig::from_env();
    let gemini = GeminiClient::new(&config).context("failed to construct Gemini client")?;
    tracing::info!(model = %config.model, base_url = %gemini.base_url(), timeout = ?config.timeout, "Gateway ready");

    let gateway: Arc<dyn GenerativeModelGateway> = Arc::new(gemini);
    let history_mode = if config.thread_history { HistoryMode::Threaded } else { HistoryMode::LatestOnly };
    let advisor = ConversationAdvisor::new(gateway.clone()).with_history_mode(history_mode);
    let app = router(AppState::new(gateway, advisor));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
