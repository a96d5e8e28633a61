use crossbeam::channel::{unbounded, Receiver};
use etherchat_engine::peers::PeerTable;
use etherchat_engine::presence::{PresenceManager, PEER_TIMEOUT};
use etherchat_engine::ManualTimeProvider;
use etherchat_proto::{Beacon, Frame, FrameBuilder, FrameType, MacAddr, PeerStatus};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn setup() -> (
    Arc<PresenceManager>,
    Arc<PeerTable>,
    Receiver<Option<Frame>>,
    Arc<ManualTimeProvider>,
) {
    let peers = Arc::new(PeerTable::new());
    let local: MacAddr = "02:00:00:00:00:01".parse().unwrap();
    let builder = Arc::new(Mutex::new(FrameBuilder::with_rng(
        local,
        "carol",
        StdRng::seed_from_u64(5),
    )));
    let (outbound_tx, outbound_rx) = unbounded();
    let time = Arc::new(ManualTimeProvider::new(Instant::now()));
    let manager = Arc::new(PresenceManager::new(
        Arc::clone(&peers),
        builder,
        outbound_tx,
        time.clone(),
    ));
    (manager, peers, outbound_rx, time)
}

fn beacon_frame(src: &str, payload: &[u8]) -> Frame {
    Frame {
        dst: MacAddr::BROADCAST,
        src: src.parse().unwrap(),
        frame_type: FrameType::Broadcast,
        transfer_id: 1,
        fragment_no: 1,
        total_frags: 1,
        payload: payload.to_vec(),
    }
}

#[test]
fn test_online_beacon_creates_peer() {
    let (manager, peers, _outbound_rx, _time) = setup();
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|online"));

    let snapshot = peers.snapshot();
    let mac: MacAddr = "02:00:00:00:00:02".parse().unwrap();
    let info = snapshot.get(&mac).expect("peer missing");
    assert_eq!(info.username, "alice");
    assert_eq!(info.status, PeerStatus::Online);
}

#[test]
fn test_online_beacon_refreshes_last_seen() {
    let (manager, peers, _outbound_rx, time) = setup();
    let frame = beacon_frame("02:00:00:00:00:02", b"alice|online");
    manager.ingest(&frame);
    let first_seen = peers.snapshot().values().next().unwrap().last_seen;

    time.advance(Duration::from_secs(10));
    manager.ingest(&frame);
    let refreshed = peers.snapshot().values().next().unwrap().last_seen;
    assert_eq!(refreshed.duration_since(first_seen), Duration::from_secs(10));
}

#[test]
fn test_offline_beacon_removes_peer() {
    let (manager, peers, _outbound_rx, _time) = setup();
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|online"));
    assert_eq!(peers.len(), 1);
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|offline"));
    assert!(peers.is_empty());
}

#[test]
fn test_malformed_beacons_are_dropped() {
    let (manager, peers, _outbound_rx, _time) = setup();
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b""));
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice"));
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|away"));
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|online|x"));
    manager.ingest(&beacon_frame("02:00:00:00:00:02", &[0xFF, 0xFE]));
    assert!(peers.is_empty());
}

#[test]
fn test_peers_expire_after_timeout() {
    let (manager, peers, _outbound_rx, time) = setup();
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|online"));
    time.advance(Duration::from_secs(30));
    manager.ingest(&beacon_frame("02:00:00:00:00:03", b"bob|online"));

    // alice is now 90s+ old, bob only 60s+.
    time.advance(PEER_TIMEOUT - Duration::from_secs(29));
    assert_eq!(manager.cleanup(), 1);

    let snapshot = peers.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.values().next().unwrap().username, "bob");
}

#[test]
fn test_announce_online_enqueues_beacon() {
    let (manager, _peers, outbound_rx, _time) = setup();
    manager.announce_online();
    let frame = outbound_rx.try_recv().unwrap().unwrap();
    assert_eq!(frame.frame_type, FrameType::Broadcast);
    assert!(frame.dst.is_broadcast());
    let beacon = Beacon::parse(&frame.payload).unwrap();
    assert_eq!(beacon.username, "carol");
    assert_eq!(beacon.status, PeerStatus::Online);
}

#[test]
fn test_announce_offline_enqueues_beacon() {
    let (manager, _peers, outbound_rx, _time) = setup();
    manager.announce_offline();
    let frame = outbound_rx.try_recv().unwrap().unwrap();
    let beacon = Beacon::parse(&frame.payload).unwrap();
    assert_eq!(beacon.status, PeerStatus::Offline);
}

#[test]
fn test_snapshot_is_a_defensive_copy() {
    let (manager, peers, _outbound_rx, _time) = setup();
    manager.ingest(&beacon_frame("02:00:00:00:00:02", b"alice|online"));
    let mut snapshot = peers.snapshot();
    snapshot.clear();
    assert_eq!(peers.len(), 1);
}
