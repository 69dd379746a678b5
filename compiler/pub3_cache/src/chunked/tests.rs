use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use super::*;
use crate::protocol::{GetFileArg, GetFileReply};
use crate::transport::TransportError;

/// Serves chunk bodies by hash and counts requests.
#[derive(Default)]
struct ChunkStore {
    chunks: FxHashMap<ContentHash, Vec<u8>>,
    requests: AtomicUsize,
    corrupt: bool,
}

impl ChunkStore {
    fn serving(bodies: &[Vec<u8>]) -> Self {
        let chunks = bodies.iter().map(|b| (content_hash(b), b.clone())).collect();
        ChunkStore {
            chunks,
            ..Default::default()
        }
    }
}

impl Transport for ChunkStore {
    fn get_file(&self, _arg: GetFileArg) -> BoxFuture<'static, Result<GetFileReply, TransportError>> {
        futures::future::ready(Ok(GetFileReply::NotFound)).boxed()
    }

    fn get_chunk(&self, arg: GetChunkArg) -> BoxFuture<'static, Result<Vec<u8>, TransportError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let reply = match self.chunks.get(&arg.hash) {
            Some(body) if self.corrupt => {
                let mut body = body.clone();
                body[0] ^= 0xff;
                Ok(body)
            }
            Some(body) => Ok(body.clone()),
            None => Err(TransportError::Rpc("unknown chunk".to_string())),
        };
        futures::future::ready(reply).boxed()
    }
}

#[tokio::test]
async fn test_reassembles_chunks_at_their_offsets() {
    let first = vec![1u8; 100];
    let second = vec![2u8; 50];
    let body = [first.clone(), second.clone()].concat();
    let (header, bodies) = ChunkHeader::split(&body, 100);
    assert_eq!(
        header.chunks.iter().map(|c| (c.offset, c.length)).collect::<Vec<_>>(),
        vec![(0, 100), (100, 50)]
    );

    let store = ChunkStore::serving(&bodies);
    let out = fetch_chunked(&store, &header, 1 << 20).await.unwrap();

    assert_eq!(&out[..100], &first[..]);
    assert_eq!(&out[100..150], &second[..]);
    assert_eq!(store.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_repeated_chunk_fetched_once() {
    let body: Vec<u8> = [vec![7u8; 8], vec![9u8; 8], vec![7u8; 8], vec![7u8; 8]].concat();
    let (header, bodies) = ChunkHeader::split(&body, 8);
    assert_eq!(header.distinct_chunks(), 2);

    let store = ChunkStore::serving(&bodies);
    let out = fetch_chunked(&store, &header, 1 << 20).await.unwrap();

    assert_eq!(out, body);
    assert_eq!(store.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_corrupt_chunk_fails() {
    let body = vec![3u8; 64];
    let (header, bodies) = ChunkHeader::split(&body, 32);
    let store = ChunkStore {
        corrupt: true,
        ..ChunkStore::serving(&bodies)
    };

    let err = fetch_chunked(&store, &header, 1 << 20).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Protocol(ProtocolError::ChunkHash {
            hash: header.chunks[0].hash
        })
    );
}

#[tokio::test]
async fn test_wrong_file_hash_fails() {
    let body = vec![4u8; 20];
    let (mut header, bodies) = ChunkHeader::split(&body, 10);
    header.file_hash = content_hash(b"something else");
    let store = ChunkStore::serving(&bodies);

    let err = fetch_chunked(&store, &header, 1 << 20).await.unwrap_err();
    assert!(matches!(err, FetchError::Protocol(ProtocolError::FileHash { .. })));
}

#[tokio::test]
async fn test_invalid_header_sends_nothing() {
    let body = vec![5u8; 20];
    let (header, bodies) = ChunkHeader::split(&body, 10);
    let store = ChunkStore::serving(&bodies);

    let err = fetch_chunked(&store, &header, 10).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Protocol(ProtocolError::TooLarge { size: 20, max: 10 })
    );
    assert_eq!(store.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_fails_fetch() {
    let body = vec![6u8; 20];
    let (header, _) = ChunkHeader::split(&body, 10);
    let store = ChunkStore::default();

    let err = fetch_chunked(&store, &header, 1 << 20).await.unwrap_err();
    assert_eq!(err, FetchError::Transport("unknown chunk".to_string()));
}
