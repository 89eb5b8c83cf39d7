//! ferryd — the two Ferry role daemons.
//!
//! `registrard` binds the rendezvous address, watches a directory, and
//! serves announced files chunk by chunk. `requesterd` connects, pulls
//! announced files with credit-based flow control, and hands completed
//! files to the relay.
//!
//! Both roles run one sequential control loop. Once a transfer starts it
//! owns the loop until it terminates. Control commands from the serving
//! peer that arrive mid-transfer are set aside and handled right after, so
//! a completion announcement for an earlier file is never lost. That
//! single-transfer-at-a-time capture is a protocol property the tests rely
//! on, not incidental blocking.

pub mod pull;
pub mod registrar;
pub mod requester;
pub mod serve;
pub mod watcher;

pub use registrar::Registrar;
pub use requester::Requester;
