use crate::time::TimeProvider;
use crossbeam::channel::Sender;
use etherchat_proto::{Frame, FrameType};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a registered frame may wait for its ack before a
/// retransmission.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(15);
/// Retransmissions attempted before a send is declared failed.
pub const MAX_RETRIES: u32 = 3;
/// Sweep cadence.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Key of a pending send: `(transfer_id, fragment_no)`, with a
/// fragment_no of 0 for anything that is not a file fragment.
pub type PendingKey = (u16, u16);

#[derive(Debug, Clone)]
struct PendingSend {
    frame: Frame,
    sent_at: Instant,
    retries: u32,
    description: String,
}

/// Tracks frames awaiting acknowledgement and owns the transfer-id
/// allocator.
///
/// Ids are assigned exactly once, here; nothing downstream (the sender
/// worker in particular) ever rewrites a frame, so a retransmission is
/// byte-identical to the original send.
pub struct RetryManager {
    pending: Mutex<HashMap<PendingKey, PendingSend>>,
    next_transfer_id: Mutex<u16>,
    outbound_tx: Sender<Option<Frame>>,
    notify_tx: Sender<String>,
    time: Arc<dyn TimeProvider>,
}

impl RetryManager {
    pub fn new(
        outbound_tx: Sender<Option<Frame>>,
        notify_tx: Sender<String>,
        time: Arc<dyn TimeProvider>,
        rng: &mut impl Rng,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            // Random origin so ids rarely collide across restarts.
            next_transfer_id: Mutex::new(rng.gen()),
            outbound_tx,
            notify_tx,
            time,
        }
    }

    /// Allocates the next transfer id: a monotonic 16-bit counter.
    pub fn next_transfer_id(&self) -> u16 {
        let mut id = self.next_transfer_id.lock();
        *id = id.wrapping_add(1);
        *id
    }

    fn key_for(frame: &Frame) -> PendingKey {
        if frame.frame_type == FrameType::File {
            (frame.transfer_id, frame.fragment_no)
        } else {
            (frame.transfer_id, 0)
        }
    }

    /// Registers a frame for acknowledgement tracking and enqueues it.
    /// Returns false when the key is already pending.
    pub fn register(&self, frame: Frame, description: impl Into<String>) -> bool {
        let description = description.into();
        let key = Self::key_for(&frame);
        let mut pending = self.pending.lock();
        if pending.contains_key(&key) {
            warn!("key {:?} already pending: {}", key, description);
            return false;
        }
        debug!("registered {:?}: {}", key, description);
        pending.insert(
            key,
            PendingSend {
                frame: frame.clone(),
                sent_at: self.time.now(),
                retries: 0,
                description,
            },
        );
        // Enqueued under the table lock: an ack can never race a
        // registration it has not yet observed.
        let _ = self.outbound_tx.send(Some(frame));
        true
    }

    /// Handles an `ack` (fragment_no 0) or `file_ack` control message.
    /// Returns true when a pending entry matched.
    pub fn on_ack(&self, transfer_id: u16, fragment_no: u16) -> bool {
        let mut pending = self.pending.lock();
        match pending.remove(&(transfer_id, fragment_no)) {
            Some(entry) => {
                debug!(
                    "ack matched ({}, {}): {}",
                    transfer_id, fragment_no, entry.description
                );
                if entry.frame.frame_type == FrameType::File
                    && fragment_no == entry.frame.total_frags
                {
                    let _ = self.notify_tx.send(format!(
                        "Transfer {} completed: {}",
                        transfer_id, entry.description
                    ));
                }
                true
            }
            None => {
                debug!("ack for unknown key ({}, {})", transfer_id, fragment_no);
                false
            }
        }
    }

    /// One sweep pass: retransmits timed-out entries and expires those
    /// out of retries.
    pub fn sweep(&self) {
        let now = self.time.now();
        let mut pending = self.pending.lock();
        let mut expired = Vec::new();
        for (key, entry) in pending.iter_mut() {
            if now.duration_since(entry.sent_at) <= ACK_TIMEOUT {
                continue;
            }
            if entry.retries < MAX_RETRIES {
                entry.retries += 1;
                entry.sent_at = now;
                info!(
                    "retry {}/{} for {:?}: {}",
                    entry.retries, MAX_RETRIES, key, entry.description
                );
                let _ = self.outbound_tx.send(Some(entry.frame.clone()));
            } else {
                expired.push(*key);
            }
        }
        for key in expired {
            if let Some(entry) = pending.remove(&key) {
                warn!(
                    "giving up on {:?} after {} retries: {}",
                    key, MAX_RETRIES, entry.description
                );
                let _ = self.notify_tx.send(format!(
                    "Error: could not deliver {} to {}",
                    entry.description, entry.frame.dst
                ));
            }
        }
    }

    pub fn is_pending(&self, transfer_id: u16, fragment_no: u16) -> bool {
        self.pending.lock().contains_key(&(transfer_id, fragment_no))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Periodic sweep worker.
pub fn spawn_retry_sweeper(
    manager: Arc<RetryManager>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("retry sweeper started");
        while running.load(Ordering::SeqCst) {
            thread::sleep(CHECK_INTERVAL);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            manager.sweep();
        }
        debug!("retry sweeper stopped");
    })
}
