//! The RPC channel to the file service.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::protocol::{GetChunkArg, GetFileArg, GetFileReply};

/// Failure of one RPC.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel is gone. Fatal to every in-flight fetch.
    #[error("connection lost")]
    ConnectionLost,
    #[error("rpc failed: {0}")]
    Rpc(String),
}

/// Client side of the file service.
///
/// Both calls return `'static` futures so fetches can run as spawned tasks
/// that outlive the publish that started them.
pub trait Transport: Send + Sync + 'static {
    /// `GetFile(name, cached)`.
    fn get_file(&self, arg: GetFileArg) -> BoxFuture<'static, Result<GetFileReply, TransportError>>;

    /// `GetChunk(hash, offset, length)`: the body of one chunk.
    fn get_chunk(&self, arg: GetChunkArg) -> BoxFuture<'static, Result<Vec<u8>, TransportError>>;
}
