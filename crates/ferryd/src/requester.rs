//! Requester — connects to the registrar, pulls announced files, and runs
//! the upload/convert/announce completion pipeline.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use ferry_channel::{ChannelError, DealerChannel};
use ferry_core::Command;
use ferry_mesh::DEFAULT_CSV_NAME;

use crate::pull::pull_file;

pub struct Requester {
    dealer: DealerChannel,
    save_dir: PathBuf,
    relay_url: String,
    chunk_size: usize,
    pipeline: usize,
}

impl Requester {
    pub fn new(
        dealer: DealerChannel,
        save_dir: PathBuf,
        relay_url: String,
        chunk_size: usize,
        pipeline: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(&save_dir)
            .with_context(|| format!("failed to create {}", save_dir.display()))?;
        Ok(Self {
            dealer,
            save_dir,
            relay_url,
            chunk_size,
            pipeline,
        })
    }

    /// Introduce ourselves and wait for confirmation.
    ///
    /// Each attempt sends one `connect` and waits up to `interval` for the
    /// `established` reply, so when the registrar never answers exactly
    /// `attempts` connect messages go out before the budget is exhausted.
    pub async fn handshake(&mut self, attempts: u32, interval: Duration) -> Result<()> {
        for attempt in 1..=attempts {
            tracing::info!(attempt, "sending connection message");
            self.dealer.send(&Command::Connect.to_frames()).await?;

            match self.dealer.recv_timeout(interval).await? {
                Some(frames) => match Command::from_frames(&frames) {
                    Ok(Command::Established) => {
                        tracing::info!("connection established");
                        return Ok(());
                    }
                    Ok(other) => {
                        tracing::warn!(?other, "unexpected reply during handshake, dropping");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable handshake reply, dropping");
                    }
                },
                None => {
                    tracing::warn!(attempt, "no confirmation yet, retrying");
                }
            }
        }
        bail!("connection not established after {attempts} attempts");
    }

    /// Block on announcements until the channel goes away; each `new_file`
    /// captures the loop for the full pull and completion pipeline.
    /// Teardown of the registrar's end is a clean shutdown, not an error.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(save_dir = %self.save_dir.display(), "requester running");
        loop {
            let frames = match self.dealer.recv().await {
                Ok(frames) => frames,
                Err(ChannelError::Closed) => {
                    tracing::info!("channel closed, exiting");
                    return Ok(());
                }
                Err(e) => return Err(e).context("channel lost"),
            };
            match Command::from_frames(&frames) {
                Ok(Command::NewFile(name)) => self.handle_new_file(&name).await?,
                Ok(other) => {
                    tracing::warn!(?other, "unexpected command, dropping");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable message, dropping");
                }
            }
        }
    }

    async fn handle_new_file(&mut self, name: &str) -> Result<()> {
        tracing::info!(file = name, "file announced, pulling");
        let dest = self.save_dir.join(name);
        pull_file(&mut self.dealer, &dest, self.chunk_size, self.pipeline)
            .await
            .with_context(|| format!("pull of {name} failed"))?;

        // Upload failures are fatal: the registrar was told nothing and
        // retrying blind would desynchronize the announcement stream.
        ferry_relay::client::upload(&self.relay_url, &dest)
            .await
            .with_context(|| format!("relay upload of {name} failed"))?;
        self.announce_ready(name).await?;

        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        if ext == "stl" {
            let csv_path = self.save_dir.join(DEFAULT_CSV_NAME);
            let csv_name = match ferry_mesh::convert_to_csv(&dest, &csv_path) {
                Ok(n) => n,
                Err(e) => {
                    // Fatal for this file only; the copy and its upload stand.
                    tracing::warn!(file = name, error = %e, "conversion failed, skipping");
                    return Ok(());
                }
            };
            ferry_relay::client::upload(&self.relay_url, &csv_path)
                .await
                .with_context(|| format!("relay upload of {csv_name} failed"))?;
            self.announce_ready(&csv_name).await?;
        }
        Ok(())
    }

    async fn announce_ready(&mut self, name: &str) -> Result<()> {
        tracing::info!(file = name, "announcing artifact ready");
        self.dealer
            .send(&Command::Download(name.to_string()).to_frames())
            .await?;
        Ok(())
    }
}
