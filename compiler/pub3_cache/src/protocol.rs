//! Messages of the file service protocol.
//!
//! A client asks for a file with the hash of the version it already holds.
//! The service answers with one of:
//! - `Unchanged`: the cached version is current
//! - `NotFound`: no such file; any cached copy is stale
//! - `FullBody`: the compiled file, for small files
//! - `Chunked`: a header listing content-addressed chunks, for large files;
//!   each chunk is then fetched with `GetChunk`
//!
//! Unsolicited `DeltaSet`s name files that changed on the service side.

use std::fmt;

use pub3_ir::ContentHash;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::codec::content_hash;
use crate::error::ProtocolError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFileArg {
    pub name: String,
    /// Hash of the locally cached version, if any.
    pub cached: Option<ContentHash>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetFileReply {
    Unchanged,
    NotFound,
    FullBody { hash: ContentHash, body: Vec<u8> },
    Chunked(ChunkHeader),
}

/// One chunk of a chunked file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDesc {
    pub hash: ContentHash,
    pub offset: u64,
    pub length: u64,
}

/// Layout of a chunked file, received before any chunk body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub total_size: u64,
    /// Hash of the reassembled file.
    pub file_hash: ContentHash,
    pub chunks: Vec<ChunkDesc>,
}

impl ChunkHeader {
    /// Check the layout before allocating anything for it.
    ///
    /// Chunks must be non-empty, start at offset 0 and follow each other
    /// without gaps or overlap, and cover exactly `total_size` bytes, which
    /// may not exceed `max_size`. Chunks sharing a hash must share a length.
    pub fn validate(&self, max_size: u64) -> Result<(), ProtocolError> {
        if self.total_size > max_size {
            return Err(ProtocolError::TooLarge {
                size: self.total_size,
                max: max_size,
            });
        }

        let mut expected = 0u64;
        let mut lengths: FxHashMap<ContentHash, u64> = FxHashMap::default();
        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.length == 0 {
                return Err(ProtocolError::EmptyChunk { index });
            }
            if chunk.offset != expected {
                return Err(ProtocolError::NonContiguous {
                    index,
                    offset: chunk.offset,
                    expected,
                });
            }
            let first = *lengths.entry(chunk.hash).or_insert(chunk.length);
            if first != chunk.length {
                return Err(ProtocolError::InconsistentChunk {
                    hash: chunk.hash,
                    first,
                    second: chunk.length,
                });
            }
            expected = expected.saturating_add(chunk.length);
        }

        if expected != self.total_size {
            return Err(ProtocolError::SizeMismatch {
                covered: expected,
                total: self.total_size,
            });
        }
        Ok(())
    }

    /// Number of distinct chunk hashes, i.e. `GetChunk` calls a fetch makes.
    pub fn distinct_chunks(&self) -> usize {
        let mut seen: Vec<ContentHash> = self.chunks.iter().map(|c| c.hash).collect();
        seen.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        seen.dedup();
        seen.len()
    }

    /// Cut `body` into chunks of at most `chunk_size` bytes.
    ///
    /// Returns the header and the chunk bodies in order. This is the
    /// service side of the protocol; clients only ever receive headers.
    pub fn split(body: &[u8], chunk_size: usize) -> (ChunkHeader, Vec<Vec<u8>>) {
        let mut chunks = Vec::new();
        let mut bodies = Vec::new();
        let mut offset = 0u64;
        for piece in body.chunks(chunk_size.max(1)) {
            let length = piece.len() as u64;
            chunks.push(ChunkDesc {
                hash: content_hash(piece),
                offset,
                length,
            });
            bodies.push(piece.to_vec());
            offset += length;
        }
        let header = ChunkHeader {
            total_size: body.len() as u64,
            file_hash: content_hash(body),
            chunks,
        };
        (header, bodies)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChunkArg {
    pub hash: ContentHash,
    pub offset: u64,
    pub length: u64,
}

impl From<&ChunkDesc> for GetChunkArg {
    fn from(chunk: &ChunkDesc) -> Self {
        GetChunkArg {
            hash: chunk.hash,
            offset: chunk.offset,
            length: chunk.length,
        }
    }
}

/// Files changed on the service since the last delta.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSet {
    /// Increases with every delta the service sends.
    pub serial: u64,
    pub files: Vec<String>,
}

/// Progress of one file fetch, as it appears in traces.
///
/// ```text
/// Idle -> RequestSent -> Cached                                  -> Complete
///                     -> Fetching -> ChunkedFetch -> Reassembling -> Complete
///                                                                 -> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchPhase {
    Idle,
    RequestSent,
    Cached,
    Fetching,
    ChunkedFetch,
    Reassembling,
    Complete,
    Failed,
}

impl FetchPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            FetchPhase::Idle => "idle",
            FetchPhase::RequestSent => "request-sent",
            FetchPhase::Cached => "cached",
            FetchPhase::Fetching => "fetching",
            FetchPhase::ChunkedFetch => "chunked-fetch",
            FetchPhase::Reassembling => "reassembling",
            FetchPhase::Complete => "complete",
            FetchPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
