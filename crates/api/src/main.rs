use anyhow::{Context, Result};
use api::{AppConfig, AppState, init_tracing, router};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing();

    let state = AppState::from_config(&config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context(format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(addr = %config.server.bind_addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
