//! requesterd — Ferry's pulling daemon.

use std::time::Duration;

use anyhow::Result;

use ferry_channel::DealerChannel;
use ferry_core::FerryConfig;
use ferryd::Requester;

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

    tracing::info!(addr = config.channel.addr(), "requesterd starting");

    let dealer = DealerChannel::connect_with_retry(
        &config.channel.addr(),
        config.transfer.handshake_attempts,
        Duration::from_millis(config.transfer.handshake_interval_ms),
    )
    .await?;
    let mut requester = Requester::new(
        dealer,
        config.requester.save_dir.clone(),
        config.relay.base_url(),
        config.transfer.chunk_size,
        config.transfer.pipeline,
    )?;
    requester
        .handshake(
            config.transfer.handshake_attempts,
            Duration::from_millis(config.transfer.handshake_interval_ms),
        )
        .await?;
    requester.run().await
}
