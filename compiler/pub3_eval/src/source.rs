//! Where published files come from.
//!
//! The publisher never reads files itself; it asks a `FileSource` for a
//! decoded `FileRecord`. The remote cache is the production source;
//! `MemorySource` serves files registered in-process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use parking_lot::RwLock;
use pub3_ir::{ContentHash, File, FileRecord};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Failure to obtain a file.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("cannot load `{name}`: {reason}")]
    Failed { name: String, reason: String },
}

/// Provider of decoded template files.
pub trait FileSource: Send + Sync {
    /// Obtain `name`, possibly suspending on I/O.
    fn get_file<'a>(&'a self, name: &'a str)
        -> LocalBoxFuture<'a, Result<Arc<FileRecord>, SourceError>>;
}

/// Maps file names to localized variants.
pub trait Localizer: Send + Sync {
    /// The localized name for `name`, or `None` to use `name` as-is.
    fn localize(&self, name: &str) -> Option<String>;

    /// When strict, a missing localized file is an error instead of falling
    /// back to the plain name.
    fn strict(&self) -> bool {
        false
    }

    /// File to publish in place of one that cannot be found.
    fn default_fnf(&self) -> Option<String> {
        None
    }
}

/// Files registered in memory, keyed by name.
///
/// Every insertion gets a fresh version hash so replacements are observable
/// as new versions.
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<FxHashMap<String, Arc<FileRecord>>>,
    version: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under its metadata name, replacing any previous one.
    pub fn insert(&self, file: File) -> Arc<FileRecord> {
        let name = file.metadata.name.clone();
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&version.to_be_bytes());
        let record = Arc::new(FileRecord::new(
            name.as_str(),
            file,
            0,
            ContentHash::from_bytes(hash),
        ));
        self.files.write().insert(name, Arc::clone(&record));
        record
    }

    pub fn remove(&self, name: &str) -> Option<Arc<FileRecord>> {
        self.files.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<FileRecord>> {
        self.files.read().get(name).cloned()
    }
}

impl FileSource for MemorySource {
    fn get_file<'a>(
        &'a self,
        name: &'a str,
    ) -> LocalBoxFuture<'a, Result<Arc<FileRecord>, SourceError>> {
        let found = self
            .get(name)
            .ok_or_else(|| SourceError::NotFound(name.to_string()));
        future::ready(found).boxed_local()
    }
}
