//! # Etherchat Proto
//!
//! Wire types for the etherchat link-layer protocol: MAC addresses, the
//! frame format and its codec, the text payload grammar for control and
//! presence traffic, and a builder for every frame shape the protocol
//! emits.
//!
//! Frames ride directly on Ethernet under a dedicated ethertype
//! (`0x88B5`); all multi-byte fields are big-endian and every frame is
//! protected by a trailing CRC-32 (IEEE 802.3).

pub mod builder;
pub mod constants;
pub mod frame;
pub mod mac;
pub mod payload;

pub use builder::{BuildError, FrameBuilder};
pub use frame::{CodecError, Frame, FrameType};
pub use mac::{MacAddr, MacParseError};
pub use payload::{Beacon, CtrlMessage, PeerStatus};
