//! relayd — Ferry's HTTP file relay.

use anyhow::Result;

use ferry_core::FerryConfig;
use ferry_relay::{serve, RelayState};

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

    tracing::info!(store_dir = %config.relay.store_dir.display(), "relayd starting");

    let state = RelayState {
        store_dir: config.relay.store_dir.clone(),
    };
    serve(state, config.relay.port).await
}
