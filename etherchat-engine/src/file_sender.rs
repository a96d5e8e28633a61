use crate::error::EngineError;
use crate::retry::RetryManager;
use crossbeam::channel::Sender;
use etherchat_proto::constants::CHUNK_SIZE;
use etherchat_proto::{Frame, FrameBuilder, MacAddr};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Fragments sent between pacing pauses, so a large transfer does not
/// starve the outbound queue.
const PACE_EVERY: u16 = 10;
const PACE_DELAY: Duration = Duration::from_millis(10);

/// Removes the temporary archive of a directory transfer on every exit
/// path.
struct TempArchive {
    path: PathBuf,
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(
                "could not remove temporary archive {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Fragments files (and zipped directories) onto the wire.
pub struct FileSender {
    builder: Arc<Mutex<FrameBuilder>>,
    outbound_tx: Sender<Option<Frame>>,
    retry: Arc<RetryManager>,
}

impl FileSender {
    pub fn new(
        builder: Arc<Mutex<FrameBuilder>>,
        outbound_tx: Sender<Option<Frame>>,
        retry: Arc<RetryManager>,
    ) -> Self {
        Self {
            builder,
            outbound_tx,
            retry,
        }
    }

    /// Sends `path` to `dst` in [`CHUNK_SIZE`] chunks. Directories are
    /// zipped into a temporary archive first and sent as a single
    /// opaque file. Returns the transfer id.
    pub fn send(&self, path: &Path, dst: MacAddr, reliable: bool) -> Result<u16, EngineError> {
        let metadata = fs::metadata(path)?;
        let transfer_id = self.retry.next_transfer_id();

        let mut archive_guard = None;
        let source = if metadata.is_dir() {
            let archive_path =
                std::env::temp_dir().join(format!("temp_transfer_{}.zip", transfer_id));
            archive_directory(path, &archive_path)?;
            info!(
                "compressed directory {} into {}",
                path.display(),
                archive_path.display()
            );
            archive_guard = Some(TempArchive {
                path: archive_path.clone(),
            });
            archive_path
        } else {
            path.to_path_buf()
        };

        let size = fs::metadata(&source)?.len();
        let total = size.div_ceil(CHUNK_SIZE as u64).max(1);
        if total > u16::MAX as u64 {
            return Err(EngineError::FileTooLarge(size));
        }
        let total_frags = total as u16;

        let basename = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let description = format!("'{}' ({} bytes)", basename, size);
        info!(
            "starting transfer {} to {}: {} in {} fragments",
            transfer_id, dst, description, total_frags
        );

        let mut file = File::open(&source)?;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        for fragment_no in 1..=total_frags {
            let read = read_chunk(&mut file, &mut chunk)?;
            let payload = if fragment_no == 1 {
                let mut payload = format!("{}|", basename).into_bytes();
                payload.extend_from_slice(&chunk[..read]);
                payload
            } else {
                chunk[..read].to_vec()
            };
            let frame = self.builder.lock().file_fragment(
                dst,
                transfer_id,
                fragment_no,
                total_frags,
                payload,
            )?;

            if reliable {
                let frag_desc = format!(
                    "fragment {}/{} of {}",
                    fragment_no, total_frags, description
                );
                if !self.retry.register(frame, frag_desc) {
                    warn!(
                        "fragment {}/{} of transfer {} collided with a pending send, aborting",
                        fragment_no, total_frags, transfer_id
                    );
                    return Ok(transfer_id);
                }
            } else {
                let _ = self.outbound_tx.send(Some(frame));
            }

            if fragment_no % PACE_EVERY == 0 {
                thread::sleep(PACE_DELAY);
            }
        }

        info!("transfer {} queued in full", transfer_id);
        drop(archive_guard);
        Ok(transfer_id)
    }
}

/// Reads up to one chunk, tolerating short reads from the filesystem.
fn read_chunk(file: &mut File, chunk: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        let n = file.read(&mut chunk[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Zips `dir` (recursively, deflate) into `archive_path`.
fn archive_directory(dir: &Path, archive_path: &Path) -> Result<(), EngineError> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().into_owned();
        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else {
            writer.start_file(name, options)?;
            let mut src = File::open(entry.path())?;
            io::copy(&mut src, &mut writer)?;
        }
    }
    writer.finish()?;
    Ok(())
}
