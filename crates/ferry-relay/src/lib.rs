//! ferry-relay — the HTTP file store used as the durable handoff point
//! between the two roles. The requester uploads completed pulls here; the
//! registrar downloads ready artifacts on `download` announcements.

pub mod client;
pub mod server;

pub use server::{serve, RelayState};
