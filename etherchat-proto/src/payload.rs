//! Text payload grammar for CTRL and BROADCAST frames.
//!
//! Both grammars are UTF-8 with `|`-separated fields. Anything that
//! does not parse exactly is dropped by the receiver, so `parse`
//! returns `Option` rather than an error.

use std::fmt;
use std::str;

/// Canonical payload of a HELLO frame.
pub const HELLO_TEXT: &str = "hello";

/// A parsed CTRL payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlMessage {
    /// `ack|<transfer_id>`: confirms receipt of a message.
    Ack { transfer_id: u16 },
    /// `nack|<transfer_id>`: informational rejection.
    Nack { transfer_id: u16 },
    /// `file_ack|<transfer_id>|<fragment_no>`: confirms one fragment.
    FileAck { transfer_id: u16, fragment_no: u16 },
}

impl CtrlMessage {
    /// Parses a CTRL payload, returning `None` for anything malformed.
    pub fn parse(payload: &[u8]) -> Option<CtrlMessage> {
        let text = str::from_utf8(payload).ok()?;
        let mut parts = text.split('|');
        let msg = match parts.next()? {
            "ack" => CtrlMessage::Ack {
                transfer_id: parts.next()?.parse().ok()?,
            },
            "nack" => CtrlMessage::Nack {
                transfer_id: parts.next()?.parse().ok()?,
            },
            "file_ack" => CtrlMessage::FileAck {
                transfer_id: parts.next()?.parse().ok()?,
                fragment_no: parts.next()?.parse().ok()?,
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(msg)
    }

    /// Renders the wire payload for this message.
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            CtrlMessage::Ack { transfer_id } => format!("ack|{}", transfer_id),
            CtrlMessage::Nack { transfer_id } => format!("nack|{}", transfer_id),
            CtrlMessage::FileAck {
                transfer_id,
                fragment_no,
            } => format!("file_ack|{}|{}", transfer_id, fragment_no),
        }
        .into_bytes()
    }
}

/// Presence state announced by a beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Online,
    Offline,
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerStatus::Online => write!(f, "online"),
            PeerStatus::Offline => write!(f, "offline"),
        }
    }
}

/// A presence beacon payload: `<username>|online` or `<username>|offline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beacon {
    pub username: String,
    pub status: PeerStatus,
}

impl Beacon {
    /// Parses a BROADCAST payload. Exactly two fields; empty usernames
    /// and unknown statuses are rejected.
    pub fn parse(payload: &[u8]) -> Option<Beacon> {
        let text = str::from_utf8(payload).ok()?;
        let mut parts = text.split('|');
        let username = parts.next()?;
        let status = match parts.next()? {
            "online" => PeerStatus::Online,
            "offline" => PeerStatus::Offline,
            _ => return None,
        };
        if username.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(Beacon {
            username: username.to_string(),
            status,
        })
    }

    pub fn to_payload(&self) -> Vec<u8> {
        format!("{}|{}", self.username, self.status).into_bytes()
    }
}
