//! pub3 Cache - remote file cache and chunked fetch protocol.
//!
//! Compiled templates live on a file service. This crate fetches them over
//! a `Transport`, keeps them decoded in a `RemoteCache`, and serves them to
//! the evaluator through `pub3_eval::FileSource`.
//!
//! # Architecture
//!
//! - `protocol`: `GetFile`/`GetChunk` messages, chunk headers, deltas
//! - `transport`: the RPC seam; hosts implement `Transport`
//! - `codec`: `bincode` wire format and SHA-256 content hashes
//! - `chunked`: parallel chunk fetch into one pre-allocated buffer
//! - `cache`: the cache proper, with one in-flight fetch per name
//!
//! A fetch either installs a fully verified file or fails as a whole;
//! failures are shared by every caller waiting on that fetch.

mod cache;
mod chunked;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

pub use cache::{CacheConfig, RemoteCache, RemoteCacheBuilder, DEFAULT_MAX_FILE_SIZE};
pub use codec::{content_hash, encode_file, BincodeDecoder, FileDecoder};
pub use error::{FetchError, ProtocolError};
pub use protocol::{
    ChunkDesc, ChunkHeader, DeltaSet, FetchPhase, GetChunkArg, GetFileArg, GetFileReply,
};
pub use transport::{Transport, TransportError};
