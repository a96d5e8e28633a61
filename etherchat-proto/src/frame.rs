use crate::constants::{CRC_SIZE, ETHERTYPE, HEADER_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE};
use crate::mac::MacAddr;
use thiserror::Error;

/// The on-wire frame type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// A text message addressed to a peer or broadcast.
    Msg = 1,
    /// One fragment of a file transfer.
    File = 2,
    /// Control traffic: acks, nacks, file-acks.
    Ctrl = 3,
    /// An opaque greeting surfaced to the application.
    Hello = 4,
    /// A presence beacon.
    Broadcast = 5,
}

impl FrameType {
    pub fn from_wire(raw: u8) -> Option<FrameType> {
        match raw {
            1 => Some(FrameType::Msg),
            2 => Some(FrameType::File),
            3 => Some(FrameType::Ctrl),
            4 => Some(FrameType::Hello),
            5 => Some(FrameType::Broadcast),
            _ => None,
        }
    }

    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// Errors produced by the frame codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("unexpected ethertype {0:#06x}")]
    BadEthertype(u16),
    #[error("unknown frame type {0}")]
    BadType(u8),
    #[error("declared payload of {declared} bytes but only {available} present")]
    LengthMismatch { declared: usize, available: usize },
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    BadCrc { stored: u32, computed: u32 },
    #[error("payload of {0} bytes exceeds the 65535-byte limit")]
    PayloadTooLarge(usize),
}

/// A single unit on the wire.
///
/// Layout (big-endian): dst MAC, src MAC, ethertype, type, transfer_id,
/// fragment_no, total_frags, payload_len, payload, CRC-32 over
/// everything preceding it. Receivers ignore any trailing bytes beyond
/// the CRC (Ethernet pads short frames).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub frame_type: FrameType,
    /// Opaque per-sender identifier of the logical transfer.
    pub transfer_id: u16,
    /// 1-based fragment index within the transfer.
    pub fragment_no: u16,
    /// Total fragments in the transfer, at least 1.
    pub total_frags: u16,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::PayloadTooLarge(self.payload.len()));
        }
        let mut buf = Vec::with_capacity(MIN_FRAME_SIZE + self.payload.len());
        buf.extend_from_slice(self.dst.as_bytes());
        buf.extend_from_slice(self.src.as_bytes());
        buf.extend_from_slice(&ETHERTYPE.to_be_bytes());
        buf.push(self.frame_type.as_wire());
        buf.extend_from_slice(&self.transfer_id.to_be_bytes());
        buf.extend_from_slice(&self.fragment_no.to_be_bytes());
        buf.extend_from_slice(&self.total_frags.to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Frame, CodecError> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(CodecError::TooShort(buf.len()));
        }

        let ethertype = u16::from_be_bytes([buf[12], buf[13]]);
        if ethertype != ETHERTYPE {
            return Err(CodecError::BadEthertype(ethertype));
        }

        let frame_type = FrameType::from_wire(buf[14]).ok_or(CodecError::BadType(buf[14]))?;
        let transfer_id = u16::from_be_bytes([buf[15], buf[16]]);
        let fragment_no = u16::from_be_bytes([buf[17], buf[18]]);
        let total_frags = u16::from_be_bytes([buf[19], buf[20]]);
        let payload_len = u16::from_be_bytes([buf[21], buf[22]]) as usize;

        let crc_offset = HEADER_SIZE + payload_len;
        if buf.len() < crc_offset + CRC_SIZE {
            return Err(CodecError::LengthMismatch {
                declared: payload_len,
                available: buf.len() - MIN_FRAME_SIZE,
            });
        }

        let mut stored = [0u8; 4];
        stored.copy_from_slice(&buf[crc_offset..crc_offset + CRC_SIZE]);
        let stored = u32::from_be_bytes(stored);
        let computed = crc32fast::hash(&buf[..crc_offset]);
        if stored != computed {
            return Err(CodecError::BadCrc { stored, computed });
        }

        let mut dst = [0u8; 6];
        dst.copy_from_slice(&buf[0..6]);
        let mut src = [0u8; 6];
        src.copy_from_slice(&buf[6..12]);

        Ok(Frame {
            dst: MacAddr::from(dst),
            src: MacAddr::from(src),
            frame_type,
            transfer_id,
            fragment_no,
            total_frags,
            payload: buf[HEADER_SIZE..crc_offset].to_vec(),
        })
    }
}
