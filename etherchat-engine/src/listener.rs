use crate::{Link, LinkError};
use crossbeam::channel::Sender;
use etherchat_proto::Frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

/// Reads frames off the link and feeds the inbound queue.
///
/// Frames addressed to other stations are dropped here (promiscuous
/// filtering), as are frames that fail to decode. A receive timeout is
/// not an error; anything else fatal on the link ends the worker.
pub fn spawn_listener(
    link: Arc<dyn Link>,
    inbound_tx: Sender<Option<Frame>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let local = link.local_mac();
        debug!("listener started on {}", local);
        while running.load(Ordering::SeqCst) {
            let buf = match link.recv() {
                Ok(buf) => buf,
                Err(LinkError::Timeout) => continue,
                Err(LinkError::Closed) => break,
                Err(e) => {
                    error!("receive failed: {}", e);
                    break;
                }
            };
            let frame = match Frame::decode(&buf) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("dropping corrupt frame: {}", e);
                    continue;
                }
            };
            if frame.dst != local && !frame.dst.is_broadcast() {
                trace!("ignoring frame addressed to {}", frame.dst);
                continue;
            }
            if inbound_tx.send(Some(frame)).is_err() {
                break;
            }
        }
        debug!("listener stopped");
    })
}
