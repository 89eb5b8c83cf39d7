//! ferry-channel — the identity-addressed asynchronous messaging channel.
//!
//! Two socket roles, mirroring the two ends of the protocol:
//!
//! - [`RouterChannel`] binds the rendezvous address. Every accepted peer is
//!   assigned an opaque [`PeerId`]; inbound messages arrive tagged with the
//!   sender's identity and outbound messages are addressed to one. Receive
//!   is available both blocking and non-blocking — the registrar polls so
//!   its directory watch can run between messages.
//! - [`DealerChannel`] connects to a router. One peer, blocking receive.
//!
//! Ordering guarantee: messages from a given peer are delivered in send
//! order, exactly once. This falls out of the construction — one TCP stream
//! per peer and one reader task per stream — and the protocol depends on
//! it, because chunk replies carry no sequence numbers.
//!
//! Channel values are created once at startup and own their sockets; drop
//! tears the whole thing down. There are no global handles.

pub mod dealer;
pub mod identity;
pub mod router;

pub use dealer::DealerChannel;
pub use identity::PeerId;
pub use router::RouterChannel;

use ferry_core::frame::FrameError;

/// Errors that can arise on a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Frame(FrameError),

    /// The transport was torn down. Both roles treat this as a clean
    /// shutdown signal, not an error.
    #[error("channel closed")]
    Closed,

    #[error("no connected peer with identity {0}")]
    UnknownPeer(PeerId),
}

impl From<FrameError> for ChannelError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Closed => ChannelError::Closed,
            other => ChannelError::Frame(other),
        }
    }
}
