use comment_service::config::{CommentConfig, SERVICE_NAME};
use comment_service::services::init_metrics;
use comment_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CommentConfig::load()?;

    init_tracing(
        SERVICE_NAME,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )?;

    // Must be installed before the first metric is recorded.
    init_metrics()?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start {}: {}", SERVICE_NAME, e);
        e
    })?;

    app.run_until_stopped().await?;
    Ok(())
}
