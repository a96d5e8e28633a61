//! # Etherchat Engine
//!
//! The link-layer protocol engine: a set of long-running workers wired
//! together by bounded queues, speaking the frame format defined in
//! `etherchat-proto` over a raw L2 link.
//!
//! ## Architecture
//!
//! - **Listener / Sender**: move frames between the link and the
//!   inbound/outbound queues.
//! - **Router**: dispatches inbound frames to presence, retry,
//!   assembly, or the application queue by frame type.
//! - **Retry manager**: per-frame acknowledgement tracking with
//!   timeout-based retransmission and bounded retries.
//! - **Presence manager**: periodic beacons and peer-expiry tracking.
//! - **File sender / assembler**: fragmentation and reassembly of file
//!   transfers, with duplicate suppression and transfer expiry.
//!
//! The [`engine::Engine`] façade owns the pipeline and exposes the
//! handle surface (send operations, inbound events, peer snapshots,
//! notifications) a UI of any kind can drive.

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_sender;
pub mod listener;
pub mod peers;
pub mod presence;
pub mod retry;
pub mod router;
pub mod sender;
pub mod testing;
pub mod time;

use etherchat_proto::MacAddr;
use std::io;

/// Errors surfaced by a link implementation.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("receive timed out")]
    Timeout,
    #[error("link is closed")]
    Closed,
    #[error("short write: {written} of {len} bytes")]
    ShortWrite { written: usize, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A raw L2 link bound to the protocol ethertype.
///
/// Exactly the operations the engine needs: blocking receive with a
/// timeout, full-buffer send, the local MAC, and close-once semantics.
/// Implemented by the AF_PACKET socket in `etherchat-link` and by
/// [`testing::VirtualLink`] for in-process simulations.
pub trait Link: Send + Sync {
    fn local_mac(&self) -> MacAddr;

    /// Transmits the full buffer; a partial write is an error.
    fn send(&self, frame: &[u8]) -> Result<(), LinkError>;

    /// Blocks for at most the link's configured timeout, surfacing
    /// [`LinkError::Timeout`] so callers can loop cleanly.
    fn recv(&self) -> Result<Vec<u8>, LinkError>;

    /// Closes the link. Idempotent; every later operation fails with
    /// [`LinkError::Closed`].
    fn close(&self);
}

/// Depth of every inter-worker queue.
pub const QUEUE_DEPTH: usize = 256;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use peers::{PeerInfo, PeerTable};
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider};
