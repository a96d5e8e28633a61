use crate::presence::PresenceManager;
use crate::retry::RetryManager;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use etherchat_proto::{CtrlMessage, Frame, FrameBuilder, FrameType, MacAddr};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// The central switch: dispatches each inbound frame by type.
pub struct Router {
    local_mac: MacAddr,
    builder: Arc<Mutex<FrameBuilder>>,
    retry: Arc<RetryManager>,
    presence: Arc<PresenceManager>,
    outbound_tx: Sender<Option<Frame>>,
    fragment_tx: Sender<Option<Frame>>,
    app_tx: Sender<Frame>,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_mac: MacAddr,
        builder: Arc<Mutex<FrameBuilder>>,
        retry: Arc<RetryManager>,
        presence: Arc<PresenceManager>,
        outbound_tx: Sender<Option<Frame>>,
        fragment_tx: Sender<Option<Frame>>,
        app_tx: Sender<Frame>,
    ) -> Self {
        Self {
            local_mac,
            builder,
            retry,
            presence,
            outbound_tx,
            fragment_tx,
            app_tx,
        }
    }

    /// Dispatches one inbound frame.
    pub fn route(&self, frame: Frame) {
        match frame.frame_type {
            FrameType::Broadcast => self.presence.ingest(&frame),
            FrameType::Ctrl => self.route_ctrl(&frame),
            FrameType::File => self.route_file(frame),
            FrameType::Msg | FrameType::Hello => {
                let _ = self.app_tx.send(frame);
            }
        }
    }

    fn route_ctrl(&self, frame: &Frame) {
        match CtrlMessage::parse(&frame.payload) {
            Some(CtrlMessage::Ack { transfer_id }) => {
                self.retry.on_ack(transfer_id, 0);
            }
            Some(CtrlMessage::FileAck {
                transfer_id,
                fragment_no,
            }) => {
                self.retry.on_ack(transfer_id, fragment_no);
            }
            Some(CtrlMessage::Nack { transfer_id }) => {
                warn!("nack for transfer {} from {}", transfer_id, frame.src);
            }
            None => debug!("dropping malformed CTRL payload from {}", frame.src),
        }
    }

    fn route_file(&self, frame: Frame) {
        // Fragments addressed to us are acked immediately; a file_ack
        // is fire-and-forget, so it goes straight to the outbound queue.
        if frame.dst == self.local_mac {
            let ack = self
                .builder
                .lock()
                .file_ack(frame.src, frame.transfer_id, frame.fragment_no);
            let _ = self.outbound_tx.send(Some(ack));
        }
        // Every fragment reaches the assembler, even those addressed
        // elsewhere, so broadcast transfers can be observed passively.
        let _ = self.fragment_tx.send(Some(frame));
    }
}

/// Worker loop: takes frames off the inbound queue until the sentinel.
pub fn spawn_router(
    router: Router,
    inbound_rx: Receiver<Option<Frame>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("router started");
        loop {
            match inbound_rx.recv_timeout(IDLE_TIMEOUT) {
                Ok(Some(frame)) => router.route(frame),
                Ok(None) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
        debug!("router stopped");
    })
}
