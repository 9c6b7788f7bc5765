use advisor_core::config::AdvisorConfig;
use advisor_core::relay::serve_relay;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,advisor_core=debug")),
        )
        .init();

    let config = AdvisorConfig::load();

    tracing::info!(
        "Starting beauty advisor relay (set OPENAI_API_KEY + optional ADVISOR_RELAY_BIND / ADVISOR_UPSTREAM_URL)"
    );

    let server_rt = tokio::runtime::Runtime::new().context("failed to start relay runtime")?;
    server_rt.block_on(serve_relay(&config))
}
