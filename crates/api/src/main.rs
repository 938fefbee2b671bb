use std::sync::Arc;

use anyhow::Context;

use vitrine_api::app::{AppServices, build_app};
use vitrine_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vitrine_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialise catalog store")?;

    let app = build_app(Arc::new(services));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
