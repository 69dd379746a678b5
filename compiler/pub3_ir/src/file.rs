//! Decoded template files and their cache identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ExprArena, StmtId};

/// SHA-256 digest identifying a file version or a chunk.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        ContentHash(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(ContentHash(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight hex digits are plenty to tell versions apart in logs.
        write!(f, "ContentHash({})", &self.to_hex()[..8])
    }
}

/// Identifies one specific version of one file.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    pub name: Arc<str>,
    pub hash: ContentHash,
}

impl CacheKey {
    pub fn new(name: impl Into<Arc<str>>, hash: ContentHash) -> Self {
        CacheKey {
            name: name.into(),
            hash,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.name, self.hash)
    }
}

/// Facts about a file that travel with its tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Path of the file relative to the publishing root, e.g. `/a/b.html`.
    pub name: String,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Metadata { name: name.into() }
    }

    /// Directory part of the name, used to resolve relative includes.
    pub fn dir(&self) -> &str {
        match self.name.rfind('/') {
            Some(0) => "/",
            Some(i) => &self.name[..i],
            None => "",
        }
    }
}

/// A compiled template: metadata, node arena and top-level statements.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct File {
    pub metadata: Metadata,
    pub arena: ExprArena,
    pub body: Vec<StmtId>,
}

impl File {
    pub fn new(metadata: Metadata, arena: ExprArena, body: Vec<StmtId>) -> Self {
        File {
            metadata,
            arena,
            body,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// A file as held by a cache: owned by the cache once installed and shared
/// read-only by every evaluator publishing it.
#[derive(Debug)]
pub struct FileRecord {
    pub name: Arc<str>,
    pub file: Arc<File>,
    /// Size of the compiled form in bytes.
    pub size: u64,
    pub hash: ContentHash,
}

impl FileRecord {
    pub fn new(name: impl Into<Arc<str>>, file: File, size: u64, hash: ContentHash) -> Self {
        FileRecord {
            name: name.into(),
            file: Arc::new(file),
            size,
            hash,
        }
    }

    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.file.metadata
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(Arc::clone(&self.name), self.hash)
    }
}
