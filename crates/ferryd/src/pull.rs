//! Credit-based puller — the requester side of a transfer.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use ferry_channel::DealerChannel;
use ferry_core::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullStats {
    pub chunks: u64,
    pub bytes: u64,
}

/// Pull a file into `dest` with a sliding window of outstanding fetches.
///
/// `credit` starts at the pipeline depth, is spent by sending a `fetch`,
/// and replenished one-for-one per chunk received, so
/// `credit + chunks_in_flight == pipeline` at every step. Replies carry no
/// sequence numbers; bytes are appended in receipt order, which is correct
/// because the channel delivers per-peer FIFO. A reply shorter than
/// `chunk_size` ends the pull.
///
/// The loop owns the channel until it returns; that is the protocol's
/// single-transfer-at-a-time policy, not an accident.
pub async fn pull_file(
    dealer: &mut DealerChannel,
    dest: &Path,
    chunk_size: usize,
    pipeline: usize,
) -> Result<PullStats> {
    let mut out =
        File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;

    let mut credit = pipeline;
    let mut offset: u64 = 0;
    let mut stats = PullStats { chunks: 0, bytes: 0 };

    loop {
        while credit > 0 {
            dealer
                .send(
                    &Command::Fetch {
                        offset,
                        length: chunk_size as u32,
                    }
                    .to_frames(),
                )
                .await?;
            offset += chunk_size as u64;
            credit -= 1;
        }

        let frames = dealer.recv().await?;
        // Chunk replies are a single untagged frame of raw bytes.
        let chunk = frames
            .first()
            .context("expected a raw chunk frame in reply")?;
        out.write_all(chunk)
            .with_context(|| format!("failed to write {}", dest.display()))?;

        credit += 1;
        stats.chunks += 1;
        stats.bytes += chunk.len() as u64;

        let in_flight = offset / chunk_size as u64 - stats.chunks;
        debug_assert_eq!(credit as u64 + in_flight, pipeline as u64);

        if chunk.len() < chunk_size {
            out.flush()?;
            tracing::info!(
                dest = %dest.display(),
                chunks = stats.chunks,
                bytes = stats.bytes,
                "file written to disk"
            );
            return Ok(stats);
        }
    }
}
