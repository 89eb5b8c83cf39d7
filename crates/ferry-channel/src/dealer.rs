//! Connect-side channel: one peer, blocking receive.

use std::time::Duration;

use bytes::Bytes;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use ferry_core::frame;

use crate::ChannelError;

/// The connecting end of the channel.
///
/// The requester's receive calls block indefinitely by design; the bounded
/// wait in [`DealerChannel::recv_timeout`] exists only for the handshake
/// retry loop, which must resend `connect` if `established` does not come.
pub struct DealerChannel {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl DealerChannel {
    /// Connect to a router.
    pub async fn connect(addr: &str) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay failed");
        }
        tracing::info!(addr, "dealer channel connected");
        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }

    /// Connect, retrying on refusal. Used at startup when the registrar may
    /// not be up yet; the budget and pacing mirror the handshake's.
    pub async fn connect_with_retry(
        addr: &str,
        attempts: u32,
        interval: Duration,
    ) -> Result<Self, ChannelError> {
        let mut remaining = attempts;
        loop {
            match Self::connect(addr).await {
                Ok(channel) => return Ok(channel),
                Err(e) => {
                    remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        return Err(e);
                    }
                    tracing::info!(addr, remaining, "connect failed, retrying");
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    /// Send one multipart message.
    pub async fn send(&mut self, frames: &[Bytes]) -> Result<(), ChannelError> {
        frame::write_message(&mut self.writer, frames).await?;
        Ok(())
    }

    /// Receive one multipart message, blocking until it arrives.
    pub async fn recv(&mut self) -> Result<Vec<Bytes>, ChannelError> {
        Ok(frame::read_message(&mut self.reader).await?)
    }

    /// Receive with a deadline. `Ok(None)` means the deadline passed with
    /// nothing on the wire.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<Bytes>>, ChannelError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
