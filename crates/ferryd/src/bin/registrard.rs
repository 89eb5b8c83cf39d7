//! registrard — Ferry's rendezvous daemon.

use std::time::Duration;

use anyhow::Result;

use ferry_channel::RouterChannel;
use ferry_core::FerryConfig;
use ferryd::Registrar;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = FerryConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });

    tracing::info!(addr = config.channel.addr(), "registrard starting");

    let router = RouterChannel::bind(&config.channel.addr()).await?;
    let registrar = Registrar::new(
        router,
        config.registrar.send_dir.clone(),
        config.registrar.save_dir.clone(),
        config.relay.base_url(),
        Duration::from_millis(config.registrar.poll_interval_ms),
    )?;
    registrar.run().await
}
