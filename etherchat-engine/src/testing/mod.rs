//! In-process simulation support: a virtual broadcast segment standing
//! in for the raw link, so integration tests can run several engines
//! against each other without privileges or real interfaces.

use crate::{Link, LinkError};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use etherchat_proto::MacAddr;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// A hub wiring any number of [`VirtualLink`]s into one broadcast
/// domain, with optional uniform frame loss.
pub struct VirtualSegment {
    taps: Mutex<Vec<(MacAddr, Sender<Vec<u8>>)>>,
    loss: Mutex<f32>,
    rng: Mutex<StdRng>,
}

impl VirtualSegment {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            taps: Mutex::new(Vec::new()),
            loss: Mutex::new(0.0),
            rng: Mutex::new(StdRng::seed_from_u64(7)),
        })
    }

    pub fn set_seed(&self, seed: u64) {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
    }

    /// Fraction of frames dropped in transit, `0.0..=1.0`.
    pub fn set_loss(&self, probability: f32) {
        *self.loss.lock() = probability;
    }

    /// Attaches a new station to the segment.
    pub fn attach(self: &Arc<Self>, mac: MacAddr) -> VirtualLink {
        let (tx, rx) = unbounded();
        self.taps.lock().push((mac, tx));
        VirtualLink {
            mac,
            segment: Arc::clone(self),
            rx,
            closed: AtomicBool::new(false),
        }
    }

    /// Delivers a frame to every station except the one that sent it,
    /// like a dumb hub would.
    fn broadcast(&self, from: MacAddr, bytes: &[u8]) {
        let loss = *self.loss.lock();
        let taps = self.taps.lock();
        for (mac, tx) in taps.iter() {
            if *mac == from {
                continue;
            }
            if loss > 0.0 && self.rng.lock().gen::<f32>() < loss {
                continue;
            }
            let _ = tx.send(bytes.to_vec());
        }
    }
}

/// One station's view of a [`VirtualSegment`].
pub struct VirtualLink {
    mac: MacAddr,
    segment: Arc<VirtualSegment>,
    rx: Receiver<Vec<u8>>,
    closed: AtomicBool,
}

impl Link for VirtualLink {
    fn local_mac(&self) -> MacAddr {
        self.mac
    }

    fn send(&self, frame: &[u8]) -> Result<(), LinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        self.segment.broadcast(self.mac, frame);
        Ok(())
    }

    fn recv(&self) -> Result<Vec<u8>, LinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        match self.rx.recv_timeout(RECV_TIMEOUT) {
            Ok(bytes) => Ok(bytes),
            Err(RecvTimeoutError::Timeout) => Err(LinkError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
