//! Offset-based file server — the registrar side of a transfer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

use ferry_channel::{PeerId, RouterChannel};
use ferry_core::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub chunks: u64,
    pub bytes: u64,
}

/// Serve one file to the peer until the terminal short reply has been sent.
///
/// This loop owns the channel for the duration of the transfer: every
/// inbound message is expected to be a `fetch` from `peer`. Other commands
/// from the same peer are pushed onto `deferred` for the caller to handle
/// once the transfer ends (a completion announcement for an earlier file
/// can arrive mid-serve). Messages from any other identity are logged and
/// dropped. The loop ends after replying with strictly fewer bytes than
/// requested — the zero-length reply counts, which is how a file of
/// exactly k·chunk_size bytes terminates (one extra round trip).
///
/// The previous transfer's over-issued window leaves `fetch` requests
/// queued that its server never answered; they reach this loop ahead of
/// the new pull's traffic. A pull always opens with `fetch(0)` and FIFO
/// puts that first, while leftovers all carry non-zero offsets (requests
/// are answered in order, so anything outstanding sits past the offset
/// that terminated the last transfer). Fetches before the opening
/// `fetch(0)` are therefore stale and dropped, never answered — answering
/// one would terminate this transfer instantly and feed the new pull a
/// bogus terminal chunk.
///
/// A missing file is logged and abandoned without a reply; `Ok(None)` is
/// returned and the peer's pull is left waiting. That gap is inherited
/// protocol behavior.
pub async fn serve_file(
    router: &mut RouterChannel,
    peer: PeerId,
    path: &Path,
    deferred: &mut Vec<Vec<Bytes>>,
) -> Result<Option<ServeStats>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "could not find file, abandoning transfer");
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open {}", path.display()));
        }
    };

    tracing::info!(path = %path.display(), %peer, "serving file");
    let mut stats = ServeStats { chunks: 0, bytes: 0 };
    let mut started = false;

    loop {
        let (sender, frames) = router.recv().await?;
        if sender != peer {
            tracing::warn!(%sender, "message from another identity during transfer, dropping");
            continue;
        }

        let (offset, length) = match Command::from_frames(&frames) {
            Ok(Command::Fetch { offset, length }) => (offset, length),
            Ok(other) => {
                tracing::debug!(?other, "non-fetch command during transfer, deferring");
                deferred.push(frames);
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "undecodable message during transfer, dropping");
                continue;
            }
        };

        if !started && offset != 0 {
            tracing::debug!(offset, "stale fetch from a previous transfer, dropping");
            continue;
        }
        started = true;

        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek to {} failed", offset))?;
        let mut data = Vec::with_capacity(length as usize);
        file.by_ref()
            .take(length as u64)
            .read_to_end(&mut data)
            .context("chunk read failed")?;

        let sent = data.len();
        router.send_to(peer, vec![Bytes::from(data)])?;
        stats.chunks += 1;
        stats.bytes += sent as u64;

        if sent < length as usize {
            tracing::info!(
                path = %path.display(),
                chunks = stats.chunks,
                bytes = stats.bytes,
                "file successfully sent"
            );
            return Ok(Some(stats));
        }
    }
}
