//! Compiled file encoding and content hashing.
//!
//! Compiled templates travel as `bincode`-encoded `pub3_ir::File`s; file
//! versions and chunks are identified by the SHA-256 of their bytes.

use pub3_ir::{ContentHash, File};
use sha2::{Digest, Sha256};

use crate::error::FetchError;

/// Turns fetched bytes into a file tree.
pub trait FileDecoder: Send + Sync {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<File, FetchError>;
}

/// Decodes the `bincode` wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeDecoder;

impl FileDecoder for BincodeDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<File, FetchError> {
        bincode::deserialize(bytes).map_err(|err| FetchError::Decode {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Encode a compiled file for the wire.
pub fn encode_file(file: &File) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(file)
}

/// SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    let digest = Sha256::digest(bytes);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    ContentHash::from_bytes(hash)
}
