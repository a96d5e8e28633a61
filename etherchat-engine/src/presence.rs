use crate::peers::PeerTable;
use crate::time::TimeProvider;
use crossbeam::channel::Sender;
use etherchat_proto::{Beacon, Frame, FrameBuilder, PeerStatus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cadence of outgoing online beacons.
pub const HELLO_INTERVAL: Duration = Duration::from_secs(30);
/// A peer silent for longer than this is dropped.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(90);
/// How often expired peers are swept.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Granularity of the beacon worker's loop; bounds how long stop()
/// waits on this worker.
const TICK: Duration = Duration::from_millis(500);

/// Owns beacon emission and the peer table lifecycle.
pub struct PresenceManager {
    peers: Arc<PeerTable>,
    builder: Arc<Mutex<FrameBuilder>>,
    outbound_tx: Sender<Option<Frame>>,
    time: Arc<dyn TimeProvider>,
}

impl PresenceManager {
    pub fn new(
        peers: Arc<PeerTable>,
        builder: Arc<Mutex<FrameBuilder>>,
        outbound_tx: Sender<Option<Frame>>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            peers,
            builder,
            outbound_tx,
            time,
        }
    }

    /// Ingests a BROADCAST frame handed over by the router.
    pub fn ingest(&self, frame: &Frame) {
        let Some(beacon) = Beacon::parse(&frame.payload) else {
            debug!("dropping malformed beacon from {}", frame.src);
            return;
        };
        match beacon.status {
            PeerStatus::Online => {
                self.peers
                    .upsert(frame.src, &beacon.username, self.time.now());
                debug!("peer {} ({}) online", beacon.username, frame.src);
            }
            PeerStatus::Offline => {
                if self.peers.remove(frame.src).is_some() {
                    info!("peer {} ({}) went offline", beacon.username, frame.src);
                }
            }
        }
    }

    /// Enqueues one online beacon.
    pub fn announce_online(&self) {
        let frame = self.builder.lock().online_beacon();
        let _ = self.outbound_tx.send(Some(frame));
    }

    /// Enqueues the final offline beacon on graceful stop.
    pub fn announce_offline(&self) {
        let frame = self.builder.lock().offline_beacon();
        let _ = self.outbound_tx.send(Some(frame));
    }

    /// Drops peers not heard from within [`PEER_TIMEOUT`].
    pub fn cleanup(&self) -> usize {
        let removed = self.peers.expire(self.time.now(), PEER_TIMEOUT);
        for (mac, info) in &removed {
            info!("peer {} ({}) expired", info.username, mac);
        }
        removed.len()
    }
}

/// Beacon worker: announces presence immediately and then every
/// [`HELLO_INTERVAL`], sweeping expired peers every
/// [`CLEANUP_INTERVAL`].
pub fn spawn_presence_beacon(
    manager: Arc<PresenceManager>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("presence beacon started");
        let mut next_beacon = Instant::now();
        let mut last_cleanup = Instant::now();
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= next_beacon {
                manager.announce_online();
                next_beacon = now + HELLO_INTERVAL;
            }
            if now.duration_since(last_cleanup) >= CLEANUP_INTERVAL {
                manager.cleanup();
                last_cleanup = now;
            }
            thread::sleep(TICK);
        }
        debug!("presence beacon stopped");
    })
}
