use anyhow::Result;
use tracing_subscriber::EnvFilter;

use dresscast::config::DresscastConfig;
use dresscast::web;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DresscastConfig::load()?;

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        version = dresscast::VERSION,
        model = %config.gemini.model,
        mock_mode = config.gemini.mock_mode,
        "starting dresscast"
    );

    web::run(config).await
}
