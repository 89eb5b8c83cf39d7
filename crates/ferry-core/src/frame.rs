//! Multipart frame codec — how Ferry messages travel on a stream.
//!
//! A message is a sequence of frames, mirroring the multipart shape of the
//! control commands in [`crate::command`]. On the wire a message is a
//! u32 frame count followed by each frame as a u32 length prefix and the
//! frame bytes, all big-endian. Zero-length frames are legal — a zero-length
//! chunk reply is the terminal signal of a transfer whose size is an exact
//! multiple of the chunk size.
//!
//! The codec assumes an ordered, reliable stream (TCP). It contributes no
//! sequencing of its own; per-peer FIFO delivery is the channel's job.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frames per message. The widest control message (`fetch`) has 3.
pub const MAX_FRAMES: u32 = 8;

/// Maximum size of a single frame. Bounds decoder allocation; comfortably
/// above any sane chunk_size setting.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Errors that can arise when reading or writing framed messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the stream")]
    Closed,

    #[error("message declares {0} frames, maximum is {MAX_FRAMES}")]
    TooManyFrames(u32),

    #[error("frame of {0} bytes exceeds maximum {MAX_FRAME_BYTES}")]
    FrameTooLarge(u32),
}

/// Write one multipart message to the stream and flush it.
pub async fn write_message<W>(writer: &mut W, frames: &[Bytes]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u32(frames.len() as u32).await?;
    for frame in frames {
        writer.write_u32(frame.len() as u32).await?;
        writer.write_all(frame).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read one multipart message from the stream.
///
/// Returns [`FrameError::Closed`] when the stream ends — clean EOF, but
/// also connection reset and broken pipe, which is how a teardown on the
/// other side surfaces when its tasks are aborted rather than allowed to
/// shut the socket down gracefully. Both roles treat all of these as
/// shutdown, not as an error.
pub async fn read_message<R>(reader: &mut R) -> Result<Vec<Bytes>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let count = match reader.read_u32().await {
        Ok(n) => n,
        Err(e) => return Err(map_teardown(e)),
    };

    if count > MAX_FRAMES {
        return Err(FrameError::TooManyFrames(count));
    }

    let mut frames = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = match reader.read_u32().await {
            Ok(n) => n,
            Err(e) => return Err(map_teardown(e)),
        };
        if len > MAX_FRAME_BYTES {
            return Err(FrameError::FrameTooLarge(len));
        }
        let mut buf = vec![0u8; len as usize];
        if let Err(e) = reader.read_exact(&mut buf).await {
            return Err(map_teardown(e));
        }
        frames.push(Bytes::from(buf));
    }

    Ok(frames)
}

fn map_teardown(e: std::io::Error) -> FrameError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
            FrameError::Closed
        }
        _ => FrameError::Io(e),
    }
}
