use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn hash(b: u8) -> ContentHash {
    ContentHash::from_bytes([b; 32])
}

fn header(total_size: u64, chunks: &[(u8, u64, u64)]) -> ChunkHeader {
    ChunkHeader {
        total_size,
        file_hash: hash(0),
        chunks: chunks
            .iter()
            .map(|&(h, offset, length)| ChunkDesc {
                hash: hash(h),
                offset,
                length,
            })
            .collect(),
    }
}

#[test]
fn test_valid_header() {
    assert_eq!(header(150, &[(1, 0, 100), (2, 100, 50)]).validate(1000), Ok(()));
    assert_eq!(header(0, &[]).validate(1000), Ok(()));
}

#[test]
fn test_gap_rejected() {
    assert_eq!(
        header(150, &[(1, 0, 100), (2, 101, 49)]).validate(1000),
        Err(ProtocolError::NonContiguous {
            index: 1,
            offset: 101,
            expected: 100
        })
    );
}

#[test]
fn test_overlap_rejected() {
    assert!(matches!(
        header(150, &[(1, 0, 100), (2, 50, 100)]).validate(1000),
        Err(ProtocolError::NonContiguous { index: 1, .. })
    ));
}

#[test]
fn test_first_chunk_must_start_at_zero() {
    assert!(matches!(
        header(10, &[(1, 5, 10)]).validate(1000),
        Err(ProtocolError::NonContiguous { index: 0, .. })
    ));
}

#[test]
fn test_empty_chunk_rejected() {
    assert_eq!(
        header(100, &[(1, 0, 100), (2, 100, 0)]).validate(1000),
        Err(ProtocolError::EmptyChunk { index: 1 })
    );
}

#[test]
fn test_size_mismatch_rejected() {
    assert_eq!(
        header(200, &[(1, 0, 100), (2, 100, 50)]).validate(1000),
        Err(ProtocolError::SizeMismatch {
            covered: 150,
            total: 200
        })
    );
}

#[test]
fn test_too_large_rejected() {
    assert_eq!(
        header(150, &[(1, 0, 100), (2, 100, 50)]).validate(149),
        Err(ProtocolError::TooLarge { size: 150, max: 149 })
    );
}

#[test]
fn test_same_hash_different_length_rejected() {
    assert_eq!(
        header(150, &[(1, 0, 100), (1, 100, 50)]).validate(1000),
        Err(ProtocolError::InconsistentChunk {
            hash: hash(1),
            first: 100,
            second: 50
        })
    );
}

#[test]
fn test_distinct_chunks() {
    let header = header(40, &[(1, 0, 10), (2, 10, 10), (1, 20, 10), (1, 30, 10)]);
    assert_eq!(header.distinct_chunks(), 2);
}

#[test]
fn test_phase_names() {
    assert_eq!(FetchPhase::ChunkedFetch.to_string(), "chunked-fetch");
    assert_eq!(FetchPhase::RequestSent.as_str(), "request-sent");
}

proptest! {
    #[test]
    fn split_always_produces_a_valid_header(
        body in proptest::collection::vec(any::<u8>(), 0..2048),
        chunk_size in 1usize..300,
    ) {
        let (header, bodies) = ChunkHeader::split(&body, chunk_size);
        prop_assert_eq!(header.validate(body.len() as u64), Ok(()));
        prop_assert_eq!(bodies.concat(), body);
        for (desc, piece) in header.chunks.iter().zip(&bodies) {
            prop_assert_eq!(desc.hash, content_hash(piece));
        }
    }
}
