//! # Etherchat Link
//!
//! The real-wire implementation of the engine's `Link` trait: a raw
//! AF_PACKET socket bound to a named interface and the protocol
//! ethertype. Opening one requires CAP_NET_RAW; that is a deployment
//! concern, not the engine's.

#[cfg(target_os = "linux")]
mod packet;

#[cfg(target_os = "linux")]
pub use packet::PacketSocket;
