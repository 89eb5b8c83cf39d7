//! Registrar — rendezvous owner: identity tracking, directory watch,
//! file serving, and relay download triggers.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;

use ferry_channel::{PeerId, RouterChannel};
use ferry_core::Command;

use crate::serve::serve_file;
use crate::watcher::DirWatcher;

/// Canonical output name for downloaded STL artifacts.
pub const CANONICAL_STL_NAME: &str = "output.stl";

pub struct Registrar {
    router: RouterChannel,
    watcher: DirWatcher,
    send_dir: PathBuf,
    save_dir: PathBuf,
    relay_url: String,
    poll_interval: Duration,
    /// Every identity that has ever sent `connect`, keyed so a per-peer
    /// session table is a data-structure change, not a redesign.
    peers: HashMap<PeerId, Instant>,
    /// The most recent `connect` sender — announcements go here.
    active: Option<PeerId>,
    /// Files that appeared before any identity was known. Announced in
    /// arrival order once a peer connects, rather than silently dropped.
    pending: VecDeque<String>,
}

impl Registrar {
    pub fn new(
        router: RouterChannel,
        send_dir: PathBuf,
        save_dir: PathBuf,
        relay_url: String,
        poll_interval: Duration,
    ) -> Result<Self> {
        std::fs::create_dir_all(&send_dir)
            .with_context(|| format!("failed to create {}", send_dir.display()))?;
        std::fs::create_dir_all(&save_dir)
            .with_context(|| format!("failed to create {}", save_dir.display()))?;
        let watcher = DirWatcher::new(&send_dir).context("failed to take initial snapshot")?;

        Ok(Self {
            router,
            watcher,
            send_dir,
            save_dir,
            relay_url,
            poll_interval,
            peers: HashMap::new(),
            active: None,
            pending: VecDeque::new(),
        })
    }

    /// The sequential control loop: drain pending control messages without
    /// blocking, serve queued files if a peer is known, then poll the
    /// directory. A transfer captures the loop until it finishes; control
    /// commands arriving mid-serve are deferred and handled right after.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(send_dir = %self.send_dir.display(), "registrar running");

        loop {
            while let Some((peer, frames)) = self.router.try_recv() {
                self.handle_message(peer, frames).await?;
            }

            if let Some(peer) = self.active {
                while let Some(name) = self.pending.pop_front() {
                    let deferred = self.announce_and_serve(peer, &name).await?;
                    for frames in deferred {
                        self.handle_message(peer, frames).await?;
                    }
                    if self.active.is_none() {
                        break;
                    }
                }
            }

            let added = self
                .watcher
                .poll()
                .context("failed to poll send directory")?;
            for name in added {
                tracing::info!(file = name, "new file found");
                if self.active.is_none() {
                    tracing::info!(file = name, "no peer connected yet, queueing");
                }
                self.pending.push_back(name);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn handle_message(&mut self, peer: PeerId, frames: Vec<Bytes>) -> Result<()> {
        match Command::from_frames(&frames) {
            Ok(Command::Connect) => {
                tracing::info!(%peer, "connection message, tracking identity");
                self.peers.insert(peer, Instant::now());
                self.active = Some(peer);
                if let Err(e) = self.router.send_to(peer, Command::Established.to_frames()) {
                    tracing::warn!(%peer, error = %e, "failed to confirm connection");
                    self.active = None;
                }
            }
            Ok(Command::Download(file_name)) => {
                tracing::info!(file = file_name, "artifact ready for download");
                self.fetch_artifact(&file_name).await;
            }
            Ok(other) => {
                tracing::warn!(%peer, ?other, "unexpected command, dropping");
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "undecodable message, dropping");
            }
        }
        Ok(())
    }

    /// Announce one file to the peer, then serve it to completion. Returns
    /// the control messages the serve loop set aside for the caller.
    async fn announce_and_serve(&mut self, peer: PeerId, name: &str) -> Result<Vec<Vec<Bytes>>> {
        let mut deferred = Vec::new();
        if let Err(e) = self
            .router
            .send_to(peer, Command::NewFile(name.to_string()).to_frames())
        {
            tracing::warn!(%peer, error = %e, "peer unreachable, requeueing announcement");
            self.active = None;
            self.pending.push_front(name.to_string());
            return Ok(deferred);
        }

        serve_file(&mut self.router, peer, &self.send_dir.join(name), &mut deferred).await?;
        Ok(deferred)
    }

    /// Best-effort, non-retried fetch from the relay.
    async fn fetch_artifact(&self, file_name: &str) {
        let save_name = artifact_save_name(file_name, &self.save_dir);
        tracing::info!(file = file_name, save_as = save_name, "fetching from relay");

        let dest = self.save_dir.join(&save_name);
        if let Err(e) = ferry_relay::client::download_to(&self.relay_url, file_name, &dest).await {
            tracing::warn!(file = file_name, error = %e, "relay download failed");
        }
    }
}

/// Naming rule for downloaded artifacts: an `stl` file takes the canonical
/// output name unless that name is already occupied; everything else keeps
/// its original name.
fn artifact_save_name(file_name: &str, save_dir: &Path) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    if ext == "stl" && !save_dir.join(CANONICAL_STL_NAME).exists() {
        CANONICAL_STL_NAME.to_string()
    } else {
        file_name.to_string()
    }
}
