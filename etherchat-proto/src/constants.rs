//! Wire-level constants for the etherchat link protocol.

/// The ethertype identifying etherchat frames on the wire.
pub const ETHERTYPE: u16 = 0x88B5;

/// Size of the fixed frame header in bytes:
/// dst (6) + src (6) + ethertype (2) + type (1) + transfer_id (2)
/// + fragment_no (2) + total_frags (2) + payload_len (2).
pub const HEADER_SIZE: usize = 23;

/// Size of the trailing CRC-32 in bytes.
pub const CRC_SIZE: usize = 4;

/// Minimum size of a well-formed frame: header plus CRC, empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// Maximum payload carried by a single frame, bounded by the 16-bit
/// length field.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Payload bytes carried per file fragment.
pub const CHUNK_SIZE: usize = 1400;
