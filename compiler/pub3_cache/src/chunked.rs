//! Chunked fetch and reassembly.
//!
//! The output buffer is allocated once from the validated header and cut
//! into disjoint slices, one per chunk. Every distinct chunk hash is fetched
//! once, straight into its slice; chunks repeating an earlier hash are
//! copied from it after all fetches finish. The reassembled file is only
//! returned once every chunk and the whole file have passed their hash
//! checks.

use futures::future::try_join_all;
use pub3_ir::ContentHash;
use rustc_hash::FxHashMap;

use crate::codec::content_hash;
use crate::error::{FetchError, ProtocolError};
use crate::protocol::{ChunkDesc, ChunkHeader, FetchPhase, GetChunkArg};
use crate::transport::Transport;

/// Fetch every chunk of `header` and reassemble the file.
pub(crate) async fn fetch_chunked(
    transport: &dyn Transport,
    header: &ChunkHeader,
    max_size: u64,
) -> Result<Vec<u8>, FetchError> {
    header.validate(max_size)?;
    let total = usize::try_from(header.total_size).map_err(|_| ProtocolError::TooLarge {
        size: header.total_size,
        max: max_size,
    })?;

    let mut buffer = vec![0u8; total];
    let mut first_seen: FxHashMap<ContentHash, usize> = FxHashMap::default();
    let mut copies: Vec<(usize, usize)> = Vec::new();

    {
        let mut fetches = Vec::new();
        let mut rest: &mut [u8] = &mut buffer;
        for (index, chunk) in header.chunks.iter().enumerate() {
            // Validated: lengths fit in the buffer and offsets are contiguous.
            let (slice, tail) = std::mem::take(&mut rest).split_at_mut(chunk_len(chunk));
            rest = tail;
            match first_seen.get(&chunk.hash) {
                Some(&source) => copies.push((source, index)),
                None => {
                    first_seen.insert(chunk.hash, index);
                    fetches.push(fetch_chunk(transport, chunk, slice));
                }
            }
        }

        tracing::debug!(
            phase = %FetchPhase::ChunkedFetch,
            chunks = header.chunks.len(),
            requests = fetches.len(),
            total,
            "fetching chunks"
        );
        try_join_all(fetches).await?;
    }

    tracing::trace!(phase = %FetchPhase::Reassembling, copies = copies.len());
    for (source, target) in copies {
        let from = &header.chunks[source];
        let start = chunk_offset(from);
        buffer.copy_within(start..start + chunk_len(from), chunk_offset(&header.chunks[target]));
    }

    let got = content_hash(&buffer);
    if got != header.file_hash {
        return Err(ProtocolError::FileHash {
            expected: header.file_hash,
            got,
        }
        .into());
    }
    Ok(buffer)
}

/// Fetch one chunk into `slice`, checking its length and hash.
async fn fetch_chunk(
    transport: &dyn Transport,
    chunk: &ChunkDesc,
    slice: &mut [u8],
) -> Result<(), FetchError> {
    let body = transport.get_chunk(GetChunkArg::from(chunk)).await?;
    if body.len() != slice.len() {
        return Err(ProtocolError::ChunkLength {
            hash: chunk.hash,
            expected: chunk.length,
            got: body.len() as u64,
        }
        .into());
    }
    if content_hash(&body) != chunk.hash {
        return Err(ProtocolError::ChunkHash { hash: chunk.hash }.into());
    }
    slice.copy_from_slice(&body);
    Ok(())
}

// Both conversions are in range once the header fits in a `usize` buffer.
#[expect(
    clippy::cast_possible_truncation,
    reason = "validated against the buffer size"
)]
fn chunk_len(chunk: &ChunkDesc) -> usize {
    chunk.length as usize
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "validated against the buffer size"
)]
fn chunk_offset(chunk: &ChunkDesc) -> usize {
    chunk.offset as usize
}

#[cfg(test)]
mod tests;
