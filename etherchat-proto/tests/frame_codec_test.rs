use etherchat_proto::constants::{HEADER_SIZE, MIN_FRAME_SIZE};
use etherchat_proto::{CodecError, Frame, FrameType, MacAddr};

fn sample_frame(payload: Vec<u8>) -> Frame {
    Frame {
        dst: "AA:BB:CC:DD:EE:FF".parse().unwrap(),
        src: "11:22:33:44:55:66".parse().unwrap(),
        frame_type: FrameType::Msg,
        transfer_id: 0x1234,
        fragment_no: 1,
        total_frags: 1,
        payload,
    }
}

#[test]
fn test_roundtrip() {
    let frame = sample_frame(b"hola mundo".to_vec());
    let bytes = frame.encode().unwrap();
    assert_eq!(bytes.len(), MIN_FRAME_SIZE + 10);
    assert_eq!(Frame::decode(&bytes).unwrap(), frame);
}

#[test]
fn test_roundtrip_empty_payload() {
    let frame = sample_frame(Vec::new());
    let bytes = frame.encode().unwrap();
    assert_eq!(bytes.len(), MIN_FRAME_SIZE);
    assert_eq!(Frame::decode(&bytes).unwrap(), frame);
}

#[test]
fn test_roundtrip_all_types() {
    for frame_type in [
        FrameType::Msg,
        FrameType::File,
        FrameType::Ctrl,
        FrameType::Hello,
        FrameType::Broadcast,
    ] {
        let mut frame = sample_frame(vec![0xAB; 64]);
        frame.frame_type = frame_type;
        let bytes = frame.encode().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap().frame_type, frame_type);
    }
}

#[test]
fn test_big_endian_layout() {
    let bytes = sample_frame(vec![0x55; 3]).encode().unwrap();
    // dst | src | ethertype
    assert_eq!(&bytes[0..6], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    assert_eq!(&bytes[6..12], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    assert_eq!(&bytes[12..14], &[0x88, 0xB5]);
    assert_eq!(bytes[14], 1);
    assert_eq!(&bytes[15..17], &[0x12, 0x34]);
    assert_eq!(&bytes[17..19], &[0x00, 0x01]);
    assert_eq!(&bytes[19..21], &[0x00, 0x01]);
    assert_eq!(&bytes[21..23], &[0x00, 0x03]);
    assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 3], &[0x55, 0x55, 0x55]);
}

#[test]
fn test_too_short() {
    let bytes = sample_frame(Vec::new()).encode().unwrap();
    for len in 0..MIN_FRAME_SIZE {
        assert_eq!(
            Frame::decode(&bytes[..len]),
            Err(CodecError::TooShort(len)),
            "length {}",
            len
        );
    }
}

#[test]
fn test_bad_ethertype() {
    let mut bytes = sample_frame(b"x".to_vec()).encode().unwrap();
    bytes[12] = 0x08;
    bytes[13] = 0x00;
    assert_eq!(
        Frame::decode(&bytes),
        Err(CodecError::BadEthertype(0x0800))
    );
}

#[test]
fn test_bad_type() {
    let frame = sample_frame(b"x".to_vec());
    let mut bytes = frame.encode().unwrap();
    bytes[14] = 9;
    // Re-stamp the CRC so the type byte is the only fault.
    let crc_offset = bytes.len() - 4;
    let crc = crc32fast::hash(&bytes[..crc_offset]);
    bytes[crc_offset..].copy_from_slice(&crc.to_be_bytes());
    assert_eq!(Frame::decode(&bytes), Err(CodecError::BadType(9)));
}

#[test]
fn test_length_mismatch_on_truncation() {
    let bytes = sample_frame(vec![7; 100]).encode().unwrap();
    for len in MIN_FRAME_SIZE..bytes.len() {
        match Frame::decode(&bytes[..len]) {
            Err(CodecError::LengthMismatch { declared, .. }) => assert_eq!(declared, 100),
            other => panic!("expected LengthMismatch at {}, got {:?}", len, other),
        }
    }
}

#[test]
fn test_trailing_padding_ignored() {
    // Ethernet pads short frames to 60 bytes; the codec must not let
    // the padding reach the payload or the CRC check.
    let frame = sample_frame(b"hey".to_vec());
    let mut bytes = frame.encode().unwrap();
    bytes.resize(60, 0);
    assert_eq!(Frame::decode(&bytes).unwrap(), frame);
}

#[test]
fn test_single_bit_corruption_is_bad_crc() {
    let frame = sample_frame(b"corruption probe".to_vec());
    let clean = frame.encode().unwrap();
    let crc_offset = clean.len() - 4;
    // Skip offsets whose corruption is caught before the CRC check
    // (ethertype, type, payload_len); everything else must be BadCrc.
    for byte in 0..crc_offset {
        if (12..=14).contains(&byte) || (21..=22).contains(&byte) {
            continue;
        }
        for bit in 0..8 {
            let mut bytes = clean.clone();
            bytes[byte] ^= 1 << bit;
            match Frame::decode(&bytes) {
                Err(CodecError::BadCrc { .. }) => {}
                other => panic!("byte {} bit {}: expected BadCrc, got {:?}", byte, bit, other),
            }
        }
    }
}

#[test]
fn test_payload_too_large() {
    let frame = sample_frame(vec![0; 65536]);
    assert_eq!(frame.encode(), Err(CodecError::PayloadTooLarge(65536)));
}

#[test]
fn test_max_payload_roundtrip() {
    let frame = sample_frame(vec![0x42; 65535]);
    let bytes = frame.encode().unwrap();
    assert_eq!(Frame::decode(&bytes).unwrap(), frame);
}
