//! Fetch failures.
//!
//! A `FetchError` is fatal to one file fetch and is delivered, cloned, to
//! every caller waiting on that fetch. Nothing partial is ever cached.

use pub3_ir::ContentHash;
use thiserror::Error;

use crate::transport::TransportError;

/// A malformed or inconsistent reply.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("chunk {index} starts at {offset}, expected {expected}")]
    NonContiguous {
        index: usize,
        offset: u64,
        expected: u64,
    },
    #[error("chunk {index} is empty")]
    EmptyChunk { index: usize },
    #[error("chunks cover {covered} bytes, header declares {total}")]
    SizeMismatch { covered: u64, total: u64 },
    #[error("file of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("chunk {hash:?} declared with lengths {first} and {second}")]
    InconsistentChunk {
        hash: ContentHash,
        first: u64,
        second: u64,
    },
    #[error("chunk {hash:?} has {got} bytes, expected {expected}")]
    ChunkLength {
        hash: ContentHash,
        expected: u64,
        got: u64,
    },
    #[error("chunk {hash:?} failed its hash check")]
    ChunkHash { hash: ContentHash },
    #[error("file hash mismatch: expected {expected:?}, got {got:?}")]
    FileHash {
        expected: ContentHash,
        got: ContentHash,
    },
    #[error("`unchanged` reply to a request without a cached key")]
    UnexpectedUnchanged,
}

/// Why a file fetch failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The connection went away; every in-flight fetch fails with this.
    #[error("connection lost")]
    ConnectionLost,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("cannot decode `{name}`: {reason}")]
    Decode { name: String, reason: String },
    /// The fetch task stopped without producing a result.
    #[error("fetch aborted")]
    Aborted,
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionLost => FetchError::ConnectionLost,
            TransportError::Rpc(message) => FetchError::Transport(message),
        }
    }
}
