use etherchat_proto::{Beacon, BuildError, CtrlMessage, FrameBuilder, FrameType, MacAddr, PeerStatus};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn builder() -> FrameBuilder {
    let local: MacAddr = "02:11:22:33:44:55".parse().unwrap();
    FrameBuilder::with_rng(local, "alice", StdRng::seed_from_u64(3))
}

#[test]
fn test_online_beacon_shape() {
    let mut b = builder();
    let frame = b.online_beacon();
    assert_eq!(frame.frame_type, FrameType::Broadcast);
    assert!(frame.dst.is_broadcast());
    assert_eq!(frame.src, b.local_mac());
    assert_eq!(frame.fragment_no, 1);
    assert_eq!(frame.total_frags, 1);
    assert_eq!(
        Beacon::parse(&frame.payload),
        Some(Beacon {
            username: "alice".to_string(),
            status: PeerStatus::Online
        })
    );
}

#[test]
fn test_offline_beacon_shape() {
    let mut b = builder();
    let frame = b.offline_beacon();
    assert_eq!(
        Beacon::parse(&frame.payload).unwrap().status,
        PeerStatus::Offline
    );
}

#[test]
fn test_hello_defaults_to_broadcast() {
    let mut b = builder();
    let frame = b.hello(None);
    assert_eq!(frame.frame_type, FrameType::Hello);
    assert!(frame.dst.is_broadcast());
    assert_eq!(frame.payload, b"hello");

    let peer: MacAddr = "02:00:00:00:00:09".parse().unwrap();
    assert_eq!(b.hello(Some(peer)).dst, peer);
}

#[test]
fn test_ack_payloads_parse_back() {
    let mut b = builder();
    let peer: MacAddr = "02:00:00:00:00:09".parse().unwrap();

    let ack = b.ack(peer, 512);
    assert_eq!(ack.frame_type, FrameType::Ctrl);
    assert_eq!(
        CtrlMessage::parse(&ack.payload),
        Some(CtrlMessage::Ack { transfer_id: 512 })
    );

    let file_ack = b.file_ack(peer, 512, 4);
    assert_eq!(
        CtrlMessage::parse(&file_ack.payload),
        Some(CtrlMessage::FileAck {
            transfer_id: 512,
            fragment_no: 4
        })
    );

    let nack = b.nack(peer, 512);
    assert_eq!(
        CtrlMessage::parse(&nack.payload),
        Some(CtrlMessage::Nack { transfer_id: 512 })
    );
}

#[test]
fn test_message_uses_the_given_transfer_id() {
    let b = builder();
    let peer: MacAddr = "02:00:00:00:00:09".parse().unwrap();
    let frame = b.message(peer, 777, "hola");
    assert_eq!(frame.frame_type, FrameType::Msg);
    assert_eq!(frame.transfer_id, 777);
    assert_eq!(frame.payload, b"hola");
}

#[test]
fn test_file_fragment_validates_bounds() {
    let b = builder();
    let peer: MacAddr = "02:00:00:00:00:09".parse().unwrap();

    let frame = b.file_fragment(peer, 9, 2, 3, vec![1, 2, 3]).unwrap();
    assert_eq!(frame.frame_type, FrameType::File);
    assert_eq!((frame.fragment_no, frame.total_frags), (2, 3));

    assert_eq!(
        b.file_fragment(peer, 9, 0, 3, vec![1]),
        Err(BuildError::FragmentOutOfRange {
            fragment_no: 0,
            total_frags: 3
        })
    );
    assert_eq!(
        b.file_fragment(peer, 9, 4, 3, vec![1]),
        Err(BuildError::FragmentOutOfRange {
            fragment_no: 4,
            total_frags: 3
        })
    );
    assert_eq!(
        b.file_fragment(peer, 9, 1, 3, Vec::new()),
        Err(BuildError::EmptyChunk)
    );
}
