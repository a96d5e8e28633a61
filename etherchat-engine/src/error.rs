use crate::LinkError;
use etherchat_proto::{BuildError, CodecError};
use std::io;
use thiserror::Error;

/// Errors surfaced to callers of the engine façade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("frame error: {0}")]
    Build(#[from] BuildError),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("file of {0} bytes does not fit a 16-bit fragment count")]
    FileTooLarge(u64),
    #[error("transfer {0} already pending")]
    TransferPending(u16),
    #[error("engine is shut down")]
    Shutdown,
}
