//! Bind-side channel: accepts peers, tags inbound messages with identity.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ferry_core::frame::{self, FrameError};

use crate::{ChannelError, PeerId};

type PeerMap = Arc<DashMap<PeerId, mpsc::UnboundedSender<Vec<Bytes>>>>;

/// The rendezvous end of the channel.
///
/// One reader task per accepted peer feeds a single ordered inbox, so
/// messages from any one peer arrive in send order. Outbound messages are
/// queued to a per-peer writer task; sending to a departed identity is an
/// [`ChannelError::UnknownPeer`] error, as with a router socket whose peer
/// has gone away.
pub struct RouterChannel {
    incoming: mpsc::UnboundedReceiver<(PeerId, Vec<Bytes>)>,
    peers: PeerMap,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl RouterChannel {
    /// Bind the rendezvous address and start accepting peers.
    pub async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let peers: PeerMap = Arc::new(DashMap::new());
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(accept_loop(listener, peers.clone(), incoming_tx));

        tracing::info!(addr = %local_addr, "router channel bound");
        Ok(Self {
            incoming,
            peers,
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Non-blocking receive. `None` means no message is pending right now —
    /// the registrar uses this so its directory watch keeps running.
    pub fn try_recv(&mut self) -> Option<(PeerId, Vec<Bytes>)> {
        self.incoming.try_recv().ok()
    }

    /// Blocking receive. Used while a transfer owns the loop and every
    /// inbound message is expected to be a `fetch`.
    pub async fn recv(&mut self) -> Result<(PeerId, Vec<Bytes>), ChannelError> {
        self.incoming.recv().await.ok_or(ChannelError::Closed)
    }

    /// Blocking receive with an upper bound. `Ok(None)` means the timeout
    /// elapsed with nothing pending.
    pub async fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<(PeerId, Vec<Bytes>)>, ChannelError> {
        match tokio::time::timeout(timeout, self.incoming.recv()).await {
            Ok(Some(msg)) => Ok(Some(msg)),
            Ok(None) => Err(ChannelError::Closed),
            Err(_) => Ok(None),
        }
    }

    /// Queue a message to the peer with the given identity.
    pub fn send_to(&self, peer: PeerId, frames: Vec<Bytes>) -> Result<(), ChannelError> {
        let sender = self
            .peers
            .get(&peer)
            .ok_or(ChannelError::UnknownPeer(peer))?;
        sender
            .send(frames)
            .map_err(|_| ChannelError::UnknownPeer(peer))
    }
}

impl Drop for RouterChannel {
    fn drop(&mut self) {
        self.accept_task.abort();
        // Dropping the outbound senders ends each writer task, which closes
        // the streams and lets connected dealers observe shutdown.
        self.peers.clear();
    }
}

async fn accept_loop(
    listener: TcpListener,
    peers: PeerMap,
    incoming_tx: mpsc::UnboundedSender<(PeerId, Vec<Bytes>)>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay failed");
        }

        let peer = PeerId::mint();
        tracing::debug!(%peer, %addr, "peer connected");

        let (read_half, write_half) = stream.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        peers.insert(peer, out_tx);

        tokio::spawn(writer_loop(peer, write_half, out_rx, peers.clone()));
        tokio::spawn(reader_loop(
            peer,
            read_half,
            incoming_tx.clone(),
            peers.clone(),
        ));
    }
}

async fn reader_loop(
    peer: PeerId,
    mut read_half: OwnedReadHalf,
    incoming_tx: mpsc::UnboundedSender<(PeerId, Vec<Bytes>)>,
    peers: PeerMap,
) {
    loop {
        match frame::read_message(&mut read_half).await {
            Ok(frames) => {
                if incoming_tx.send((peer, frames)).is_err() {
                    break;
                }
            }
            Err(FrameError::Closed) => {
                tracing::debug!(%peer, "peer disconnected");
                break;
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "dropping peer after read error");
                break;
            }
        }
    }
    peers.remove(&peer);
}

async fn writer_loop(
    peer: PeerId,
    mut write_half: OwnedWriteHalf,
    mut out_rx: mpsc::UnboundedReceiver<Vec<Bytes>>,
    peers: PeerMap,
) {
    while let Some(frames) = out_rx.recv().await {
        if let Err(e) = frame::write_message(&mut write_half, &frames).await {
            tracing::warn!(%peer, error = %e, "write to peer failed");
            break;
        }
    }
    peers.remove(&peer);
}
