use std::sync::Arc;

use chat_relay::adapters::http::{app_router, AuthStrategy};
use chat_relay::adapters::session::InMemorySessionStore;
use chat_relay::adapters::upstream::{ClaudeAiConnector, ClaudeAiSettings};
use chat_relay::application::RelaySettings;
use chat_relay::config::AppConfig;
use chat_relay::ports::{SessionStore, UpstreamConnector};
use chat_relay::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);

    let connector: Arc<dyn UpstreamConnector> = Arc::new(ClaudeAiConnector::new(
        ClaudeAiSettings::from(&config.upstream),
    )?);
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    let strategy =
        AuthStrategy::from_config(&config.auth, &config.upstream, connector.as_ref(), store);
    let app = app_router(strategy, connector, RelaySettings::from(&config.relay));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        upstream = %config.upstream.base_url,
        "chat relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
