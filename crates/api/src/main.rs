use std::sync::Arc;

use anyhow::Context;

use catalogql_api::app::{build_app, services::build_services};
use catalogql_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalogql_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = build_services(&config)
        .await
        .context("failed to build catalog services")?;
    let backend = services.backend();

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, backend, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
