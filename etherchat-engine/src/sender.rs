use crate::{Link, LinkError};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use etherchat_proto::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drains the outbound queue onto the link.
///
/// Transient send failures are logged and the worker keeps going. The
/// queue is drained until the `None` sentinel arrives, so frames
/// enqueued ahead of it (the final offline beacon, in particular) still
/// reach the wire during shutdown.
pub fn spawn_sender(
    link: Arc<dyn Link>,
    outbound_rx: Receiver<Option<Frame>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("sender started");
        loop {
            let frame = match outbound_rx.recv_timeout(IDLE_TIMEOUT) {
                Ok(Some(frame)) => frame,
                Ok(None) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if running.load(Ordering::SeqCst) {
                        continue;
                    }
                    break;
                }
            };
            let bytes = match frame.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("dropping unencodable frame: {}", e);
                    continue;
                }
            };
            match link.send(&bytes) {
                Ok(()) => {}
                Err(LinkError::Closed) => {
                    warn!("link closed, sender exiting");
                    break;
                }
                Err(e) => warn!("send failed: {}", e),
            }
        }
        debug!("sender stopped");
    })
}
