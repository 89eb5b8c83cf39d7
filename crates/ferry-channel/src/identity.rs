//! Peer identity tokens.

use std::fmt;

/// Opaque identity assigned by the router when a peer first connects.
///
/// The token carries no meaning beyond addressing replies back to the peer
/// that sent a request. Tokens are minted randomly per connection; a peer
/// that reconnects gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 8]);

impl PeerId {
    /// Mint a fresh random identity.
    pub fn mint() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
