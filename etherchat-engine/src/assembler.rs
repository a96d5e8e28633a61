use crate::time::TimeProvider;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use etherchat_proto::{Frame, MacAddr};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Idle time after which an incomplete transfer is discarded.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);
/// Sweep cadence for idle transfers.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Transfers are keyed by `(src MAC, transfer_id)` so two senders that
/// picked the same 16-bit id cannot corrupt each other.
type TransferKey = (MacAddr, u16);

#[derive(Debug)]
struct ActiveTransfer {
    filename: String,
    total_frags: u16,
    fragments: HashMap<u16, Vec<u8>>,
    last_seen: Instant,
}

/// Reassembles incoming FILE fragments into files under the download
/// directory.
pub struct FileAssembler {
    transfers: Mutex<HashMap<TransferKey, ActiveTransfer>>,
    download_dir: PathBuf,
    time: Arc<dyn TimeProvider>,
}

impl FileAssembler {
    /// Creates the assembler, making the download directory if needed.
    pub fn new(download_dir: impl Into<PathBuf>, time: Arc<dyn TimeProvider>) -> io::Result<Self> {
        let download_dir = download_dir.into();
        fs::create_dir_all(&download_dir)?;
        Ok(Self {
            transfers: Mutex::new(HashMap::new()),
            download_dir,
            time,
        })
    }

    /// Feeds one FILE fragment. Returns the path of the assembled file
    /// when this fragment completed its transfer.
    pub fn process_fragment(&self, frame: &Frame) -> Option<PathBuf> {
        let key = (frame.src, frame.transfer_id);
        let now = self.time.now();
        let mut transfers = self.transfers.lock();

        let complete = match transfers.get_mut(&key) {
            None => {
                if frame.fragment_no != 1 {
                    warn!(
                        "fragment {} of unknown transfer {} from {}",
                        frame.fragment_no, frame.transfer_id, frame.src
                    );
                    return None;
                }
                let Some(sep) = frame.payload.iter().position(|&b| b == b'|') else {
                    warn!(
                        "first fragment of transfer {} from {} carries no filename",
                        frame.transfer_id, frame.src
                    );
                    return None;
                };
                let filename = String::from_utf8_lossy(&frame.payload[..sep])
                    .trim()
                    .to_string();
                let mut fragments = HashMap::new();
                fragments.insert(1, frame.payload[sep + 1..].to_vec());
                info!(
                    "new transfer {} from {}: {:?} ({} fragments)",
                    frame.transfer_id, frame.src, filename, frame.total_frags
                );
                transfers.insert(
                    key,
                    ActiveTransfer {
                        filename,
                        total_frags: frame.total_frags,
                        fragments,
                        last_seen: now,
                    },
                );
                frame.total_frags == 1
            }
            Some(transfer) => {
                if transfer.total_frags != frame.total_frags {
                    warn!(
                        "inconsistent fragment count for transfer {} from {}: {} != {}",
                        frame.transfer_id, frame.src, frame.total_frags, transfer.total_frags
                    );
                    return None;
                }
                if transfer.fragments.contains_key(&frame.fragment_no) {
                    debug!(
                        "duplicate fragment {} for transfer {} from {}",
                        frame.fragment_no, frame.transfer_id, frame.src
                    );
                    return None;
                }
                transfer
                    .fragments
                    .insert(frame.fragment_no, frame.payload.clone());
                transfer.last_seen = now;
                transfer.fragments.len() == transfer.total_frags as usize
            }
        };

        if !complete {
            return None;
        }
        let transfer = transfers.remove(&key)?;
        drop(transfers);

        match self.assemble(frame.transfer_id, &transfer) {
            Ok(path) => {
                info!(
                    "assembled transfer {} from {} into {}",
                    frame.transfer_id,
                    frame.src,
                    path.display()
                );
                Some(path)
            }
            Err(e) => {
                warn!("assembly of transfer {} failed: {}", frame.transfer_id, e);
                None
            }
        }
    }

    /// Writes fragments 1..=total in order to a fresh file. A partial
    /// file left behind by a write error is removed.
    fn assemble(&self, transfer_id: u16, transfer: &ActiveTransfer) -> io::Result<PathBuf> {
        let filename = sanitize_filename(&transfer.filename, transfer_id);
        let path = self.unique_path(&filename);
        let result = (|| {
            let mut file = fs::File::create(&path)?;
            for fragment_no in 1..=transfer.total_frags {
                let chunk = transfer.fragments.get(&fragment_no).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("missing fragment {}", fragment_no),
                    )
                })?;
                file.write_all(chunk)?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => Ok(path),
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    /// Picks a free path under the download directory, appending `_1`,
    /// `_2`, … before the extension until the name is unused.
    fn unique_path(&self, filename: &str) -> PathBuf {
        let candidate = self.download_dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let extension = Path::new(filename).extension().and_then(|s| s.to_str());
        let mut counter = 1;
        loop {
            let name = match extension {
                Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                None => format!("{}_{}", stem, counter),
            };
            let candidate = self.download_dir.join(name);
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Drops transfers idle for longer than [`TRANSFER_TIMEOUT`].
    pub fn cleanup(&self) -> usize {
        let now = self.time.now();
        let mut transfers = self.transfers.lock();
        let stale: Vec<TransferKey> = transfers
            .iter()
            .filter(|(_, t)| now.duration_since(t.last_seen) > TRANSFER_TIMEOUT)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            if let Some(transfer) = transfers.remove(key) {
                warn!(
                    "transfer {} from {} ({:?}) expired",
                    key.1, key.0, transfer.filename
                );
            }
        }
        stale.len()
    }

    pub fn is_active(&self, src: MacAddr, transfer_id: u16) -> bool {
        self.transfers.lock().contains_key(&(src, transfer_id))
    }

    pub fn active_len(&self) -> usize {
        self.transfers.lock().len()
    }
}

/// Restricts a declared filename to alphanumerics and `space - _ .`;
/// an empty result falls back to `file_<tid>`.
fn sanitize_filename(raw: &str, transfer_id: u16) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        format!("file_{}", transfer_id)
    } else {
        cleaned
    }
}

/// Worker loop: feeds fragments to the assembler and sweeps idle
/// transfers.
pub fn spawn_assembler(
    assembler: Arc<FileAssembler>,
    fragment_rx: Receiver<Option<Frame>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("assembler started");
        let mut last_cleanup = Instant::now();
        loop {
            match fragment_rx.recv_timeout(IDLE_TIMEOUT) {
                Ok(Some(frame)) => {
                    assembler.process_fragment(&frame);
                }
                Ok(None) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
            if last_cleanup.elapsed() >= CLEANUP_INTERVAL {
                assembler.cleanup();
                last_cleanup = Instant::now();
            }
        }
        debug!("assembler stopped");
    })
}
