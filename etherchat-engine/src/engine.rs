use crate::assembler::{self, FileAssembler};
use crate::config::Config;
use crate::error::EngineError;
use crate::file_sender::FileSender;
use crate::listener;
use crate::peers::{PeerInfo, PeerTable};
use crate::presence::{self, PresenceManager};
use crate::retry::{self, RetryManager};
use crate::router::{self, Router};
use crate::sender;
use crate::time::{SystemTimeProvider, TimeProvider};
use crate::{Link, QUEUE_DEPTH};
use crossbeam::channel::{bounded, Receiver, Sender};
use etherchat_proto::{Frame, FrameBuilder, MacAddr};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// How long `take_app_event` / `take_notification` block before giving
/// up on an empty queue.
const TAKE_TIMEOUT: Duration = Duration::from_secs(1);

struct Worker {
    name: &'static str,
    flag: Arc<AtomicBool>,
    /// Queue sentinel that unblocks the worker, if it blocks on one.
    sentinel: Option<Sender<Option<Frame>>>,
    handle: JoinHandle<()>,
}

/// The protocol engine: owns the link, the worker pipeline and the
/// shared tables, and exposes the handle surface a UI drives.
pub struct Engine {
    link: Arc<dyn Link>,
    local_mac: MacAddr,
    peers: Arc<PeerTable>,
    retry: Arc<RetryManager>,
    presence: Arc<PresenceManager>,
    assembler: Arc<FileAssembler>,
    file_sender: FileSender,
    builder: Arc<Mutex<FrameBuilder>>,
    outbound_tx: Sender<Option<Frame>>,
    app_rx: Receiver<Frame>,
    notify_rx: Receiver<String>,
    /// Stop order is fixed: listener, sender, retry, presence,
    /// assembler, router.
    workers: Vec<Worker>,
    shut_down: AtomicBool,
}

impl Engine {
    /// Builds the worker pipeline on `link` and starts it. The first
    /// online beacon goes out immediately.
    pub fn start(config: Config, link: Arc<dyn Link>) -> Result<Engine, EngineError> {
        Self::start_with_time(config, link, Arc::new(SystemTimeProvider))
    }

    /// As [`Engine::start`], with an injected time source.
    pub fn start_with_time(
        config: Config,
        link: Arc<dyn Link>,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Engine, EngineError> {
        let local_mac = link.local_mac();

        let (outbound_tx, outbound_rx) = bounded(QUEUE_DEPTH);
        let (inbound_tx, inbound_rx) = bounded(QUEUE_DEPTH);
        let (fragment_tx, fragment_rx) = bounded(QUEUE_DEPTH);
        let (app_tx, app_rx) = bounded(QUEUE_DEPTH);
        let (notify_tx, notify_rx) = bounded(QUEUE_DEPTH);

        let builder = Arc::new(Mutex::new(FrameBuilder::new(
            local_mac,
            config.username.clone(),
        )));
        let peers = Arc::new(PeerTable::new());
        let mut rng = StdRng::from_entropy();
        let retry = Arc::new(RetryManager::new(
            outbound_tx.clone(),
            notify_tx,
            Arc::clone(&time),
            &mut rng,
        ));
        let presence = Arc::new(PresenceManager::new(
            Arc::clone(&peers),
            Arc::clone(&builder),
            outbound_tx.clone(),
            Arc::clone(&time),
        ));
        let assembler = Arc::new(FileAssembler::new(
            config.download_dir.clone(),
            Arc::clone(&time),
        )?);
        let file_sender = FileSender::new(
            Arc::clone(&builder),
            outbound_tx.clone(),
            Arc::clone(&retry),
        );
        let router = Router::new(
            local_mac,
            Arc::clone(&builder),
            Arc::clone(&retry),
            Arc::clone(&presence),
            outbound_tx.clone(),
            fragment_tx.clone(),
            app_tx,
        );

        let mut workers = Vec::with_capacity(6);

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "listener",
            flag: Arc::clone(&flag),
            sentinel: None,
            handle: listener::spawn_listener(Arc::clone(&link), inbound_tx.clone(), flag),
        });

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "sender",
            flag: Arc::clone(&flag),
            sentinel: Some(outbound_tx.clone()),
            handle: sender::spawn_sender(Arc::clone(&link), outbound_rx, flag),
        });

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "retry",
            flag: Arc::clone(&flag),
            sentinel: None,
            handle: retry::spawn_retry_sweeper(Arc::clone(&retry), flag),
        });

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "presence",
            flag: Arc::clone(&flag),
            sentinel: None,
            handle: presence::spawn_presence_beacon(Arc::clone(&presence), flag),
        });

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "assembler",
            flag: Arc::clone(&flag),
            sentinel: Some(fragment_tx),
            handle: assembler::spawn_assembler(Arc::clone(&assembler), fragment_rx, flag),
        });

        let flag = Arc::new(AtomicBool::new(true));
        workers.push(Worker {
            name: "router",
            flag: Arc::clone(&flag),
            sentinel: Some(inbound_tx),
            handle: router::spawn_router(router, inbound_rx, flag),
        });

        info!("engine started on {} as {}", local_mac, config.username);
        Ok(Engine {
            link,
            local_mac,
            peers,
            retry,
            presence,
            assembler,
            file_sender,
            builder,
            outbound_tx,
            app_rx,
            notify_rx,
            workers,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn local_mac(&self) -> MacAddr {
        self.local_mac
    }

    pub fn retry(&self) -> &RetryManager {
        &self.retry
    }

    pub fn assembler(&self) -> &FileAssembler {
        &self.assembler
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::Shutdown);
        }
        Ok(())
    }

    fn enqueue(&self, frame: Frame) -> Result<(), EngineError> {
        self.outbound_tx
            .send(Some(frame))
            .map_err(|_| EngineError::Shutdown)
    }

    /// Sends a text message tracked by the retry manager. Returns the
    /// transfer id the peer will acknowledge.
    pub fn send_reliable_message(&self, dst: MacAddr, text: &str) -> Result<u16, EngineError> {
        self.ensure_running()?;
        let transfer_id = self.retry.next_transfer_id();
        let frame = self.builder.lock().message(dst, transfer_id, text);
        if !self.retry.register(frame, format!("message to {}", dst)) {
            return Err(EngineError::TransferPending(transfer_id));
        }
        Ok(transfer_id)
    }

    /// Fire-and-forget text message.
    pub fn send_unreliable_message(&self, dst: MacAddr, text: &str) -> Result<(), EngineError> {
        self.ensure_running()?;
        let transfer_id = self.retry.next_transfer_id();
        let frame = self.builder.lock().message(dst, transfer_id, text);
        self.enqueue(frame)
    }

    /// Text message to every station on the segment.
    pub fn send_broadcast(&self, text: &str) -> Result<(), EngineError> {
        self.send_unreliable_message(MacAddr::BROADCAST, text)
    }

    /// HELLO greeting; broadcast when `dst` is `None`.
    pub fn send_hello(&self, dst: Option<MacAddr>) -> Result<(), EngineError> {
        self.ensure_running()?;
        let frame = self.builder.lock().hello(dst);
        self.enqueue(frame)
    }

    /// Acknowledges a received message. Message acks are the app's
    /// call; file fragments are acked by the router on its own.
    pub fn send_ack(&self, dst: MacAddr, transfer_id: u16) -> Result<(), EngineError> {
        self.ensure_running()?;
        let frame = self.builder.lock().ack(dst, transfer_id);
        self.enqueue(frame)
    }

    /// Informational rejection of a received message.
    pub fn send_nack(&self, dst: MacAddr, transfer_id: u16) -> Result<(), EngineError> {
        self.ensure_running()?;
        let frame = self.builder.lock().nack(dst, transfer_id);
        self.enqueue(frame)
    }

    /// Sends a file or directory. Returns the transfer id shared by all
    /// its fragments.
    pub fn send_file(&self, path: &Path, dst: MacAddr, reliable: bool) -> Result<u16, EngineError> {
        self.ensure_running()?;
        self.file_sender.send(path, dst, reliable)
    }

    /// Defensive copy of the peer table.
    pub fn peers_snapshot(&self) -> HashMap<MacAddr, PeerInfo> {
        self.peers.snapshot()
    }

    /// Next inbound MSG or HELLO frame, blocking up to a second.
    pub fn take_app_event(&self) -> Option<Frame> {
        self.app_rx.recv_timeout(TAKE_TIMEOUT).ok()
    }

    /// Non-blocking variant of [`Engine::take_app_event`].
    pub fn poll_app_event(&self) -> Option<Frame> {
        self.app_rx.try_recv().ok()
    }

    /// Next system notification (transfer completed / failed), blocking
    /// up to a second.
    pub fn take_notification(&self) -> Option<String> {
        self.notify_rx.recv_timeout(TAKE_TIMEOUT).ok()
    }

    /// Stops the pipeline: one offline beacon, workers stopped in fixed
    /// order with their sentinels, then the link is closed. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("engine shutting down");
        self.presence.announce_offline();
        for worker in self.workers.drain(..) {
            worker.flag.store(false, Ordering::SeqCst);
            if let Some(sentinel) = &worker.sentinel {
                let _ = sentinel.send(None);
            }
            if worker.handle.join().is_err() {
                warn!("worker {} panicked during shutdown", worker.name);
            }
        }
        self.link.close();
        info!("engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
