use anyhow::Context;
use tracing_subscriber::EnvFilter;

use gemini_relay::config::Config;
use gemini_relay::routes;
use gemini_relay::startup::bind_with_retry;
use gemini_relay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gemini_relay=info,tower_http=info")),
        )
        .init();

    let config = Config::load();
    if config.has_api_key() {
        tracing::info!(model = %config.model, "Gemini API key configured");
    } else {
        tracing::warn!("No GEMINI_API_KEY or GOOGLE_API_KEY found in environment");
    }

    let listener = bind_with_retry(&config.host, config.port, config.max_port_attempts)
        .await
        .context("failed to bind listener")?;
    let addr = listener.local_addr()?;

    let state = std::sync::Arc::new(AppState::with_gemini(config));
    let app = routes::create_app(state);

    tracing::info!(%addr, "Gemini relay running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
