use crate::frame::{Frame, FrameType};
use crate::mac::MacAddr;
use crate::payload::{Beacon, CtrlMessage, PeerStatus, HELLO_TEXT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("fragment_no {fragment_no} outside [1, {total_frags}]")]
    FragmentOutOfRange { fragment_no: u16, total_frags: u16 },
    #[error("file fragment payload must not be empty")]
    EmptyChunk,
}

/// Builds every frame shape the protocol emits, stamped with the local
/// MAC and username.
///
/// Control frames that nobody tracks (acks, beacons, hellos) get a
/// random `transfer_id`; reliable sends receive theirs from the retry
/// manager's allocator and pass it in.
pub struct FrameBuilder {
    local_mac: MacAddr,
    username: String,
    rng: StdRng,
}

impl FrameBuilder {
    pub fn new(local_mac: MacAddr, username: impl Into<String>) -> Self {
        Self::with_rng(local_mac, username, StdRng::from_entropy())
    }

    /// Builder with a seeded RNG for deterministic tests.
    pub fn with_rng(local_mac: MacAddr, username: impl Into<String>, rng: StdRng) -> Self {
        Self {
            local_mac,
            username: username.into(),
            rng,
        }
    }

    pub fn local_mac(&self) -> MacAddr {
        self.local_mac
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn gen_id(&mut self) -> u16 {
        self.rng.gen()
    }

    fn frame(
        &self,
        dst: MacAddr,
        frame_type: FrameType,
        transfer_id: u16,
        payload: Vec<u8>,
    ) -> Frame {
        Frame {
            dst,
            src: self.local_mac,
            frame_type,
            transfer_id,
            fragment_no: 1,
            total_frags: 1,
            payload,
        }
    }

    pub fn online_beacon(&mut self) -> Frame {
        let payload = Beacon {
            username: self.username.clone(),
            status: PeerStatus::Online,
        }
        .to_payload();
        let id = self.gen_id();
        self.frame(MacAddr::BROADCAST, FrameType::Broadcast, id, payload)
    }

    pub fn offline_beacon(&mut self) -> Frame {
        let payload = Beacon {
            username: self.username.clone(),
            status: PeerStatus::Offline,
        }
        .to_payload();
        let id = self.gen_id();
        self.frame(MacAddr::BROADCAST, FrameType::Broadcast, id, payload)
    }

    /// A HELLO greeting; broadcast when no destination is given.
    pub fn hello(&mut self, dst: Option<MacAddr>) -> Frame {
        let id = self.gen_id();
        self.frame(
            dst.unwrap_or(MacAddr::BROADCAST),
            FrameType::Hello,
            id,
            HELLO_TEXT.as_bytes().to_vec(),
        )
    }

    pub fn message(&self, dst: MacAddr, transfer_id: u16, text: &str) -> Frame {
        self.frame(dst, FrameType::Msg, transfer_id, text.as_bytes().to_vec())
    }

    pub fn ack(&mut self, dst: MacAddr, acked_id: u16) -> Frame {
        let payload = CtrlMessage::Ack {
            transfer_id: acked_id,
        }
        .to_payload();
        let id = self.gen_id();
        self.frame(dst, FrameType::Ctrl, id, payload)
    }

    pub fn nack(&mut self, dst: MacAddr, rejected_id: u16) -> Frame {
        let payload = CtrlMessage::Nack {
            transfer_id: rejected_id,
        }
        .to_payload();
        let id = self.gen_id();
        self.frame(dst, FrameType::Ctrl, id, payload)
    }

    pub fn file_ack(&mut self, dst: MacAddr, transfer_id: u16, fragment_no: u16) -> Frame {
        let payload = CtrlMessage::FileAck {
            transfer_id,
            fragment_no,
        }
        .to_payload();
        let id = self.gen_id();
        self.frame(dst, FrameType::Ctrl, id, payload)
    }

    /// One fragment of a file transfer. The payload for fragment 1 must
    /// already carry the `<basename>|` prefix.
    pub fn file_fragment(
        &self,
        dst: MacAddr,
        transfer_id: u16,
        fragment_no: u16,
        total_frags: u16,
        payload: Vec<u8>,
    ) -> Result<Frame, BuildError> {
        if fragment_no == 0 || fragment_no > total_frags {
            return Err(BuildError::FragmentOutOfRange {
                fragment_no,
                total_frags,
            });
        }
        if payload.is_empty() {
            return Err(BuildError::EmptyChunk);
        }
        Ok(Frame {
            dst,
            src: self.local_mac,
            frame_type: FrameType::File,
            transfer_id,
            fragment_no,
            total_frags,
            payload,
        })
    }
}
