//! The remote file cache.
//!
//! Files are fetched from the service on demand and kept, decoded, until a
//! delta or a `NotFound` reply invalidates them. Every request revalidates
//! with the service by sending the cached hash; an `Unchanged` reply hands
//! back the cached record itself.
//!
//! # In-flight fetches
//!
//! At most one fetch per name is outstanding. The first caller spawns it as
//! a tokio task and records a `Shared` handle in the pending table; later
//! callers for the same name await that handle instead of sending another
//! request. The task runs to completion even if every caller goes away, so
//! an abandoned publish never leaves the cache half-updated.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{AbortHandle, Abortable, BoxFuture, LocalBoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use pub3_eval::{FileSource, SourceError};
use pub3_ir::{ContentHash, FileRecord};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chunked::fetch_chunked;
use crate::codec::{content_hash, BincodeDecoder, FileDecoder};
use crate::error::{FetchError, ProtocolError};
use crate::protocol::{DeltaSet, FetchPhase, GetFileArg, GetFileReply};
use crate::transport::Transport;

/// Largest file accepted by default: 64 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 << 20;

/// Cache settings.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Replies declaring a larger file are rejected before any allocation.
    pub max_file_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

type FetchResult = Result<Arc<FileRecord>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// One outstanding fetch.
struct Pending {
    fetch: SharedFetch,
    abort: AbortHandle,
    /// Set by a delta naming this file; the result is then not cached.
    stale: Arc<AtomicBool>,
    id: u64,
}

struct Inner {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn FileDecoder>,
    config: CacheConfig,
    entries: DashMap<Arc<str>, Arc<FileRecord>>,
    pending: Mutex<FxHashMap<Arc<str>, Pending>>,
    next_id: AtomicU64,
    delta_serial: AtomicU64,
}

/// Client-side cache of compiled files held by a remote service.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct RemoteCache {
    inner: Arc<Inner>,
}

impl RemoteCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> RemoteCacheBuilder {
        RemoteCacheBuilder::new(transport)
    }

    /// Obtain `name`, revalidating any cached copy with the service.
    ///
    /// Must be called within a tokio runtime.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_file(&self, name: &str) -> FetchResult {
        self.join_or_start(name).await
    }

    /// The cached record for `name`, without asking the service.
    pub fn cached(&self, name: &str) -> Option<Arc<FileRecord>> {
        self.inner.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the cached record for `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<FileRecord>> {
        self.inner.entries.remove(name).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Serial of the newest delta applied.
    pub fn delta_serial(&self) -> u64 {
        self.inner.delta_serial.load(Ordering::Acquire)
    }

    /// Invalidate the files a delta names.
    ///
    /// Cached records are dropped, and fetches already in flight for those
    /// names still complete for their callers but are not cached.
    pub fn apply_delta(&self, delta: &DeltaSet) {
        self.inner
            .delta_serial
            .fetch_max(delta.serial, Ordering::AcqRel);
        let pending = self.inner.pending.lock();
        for name in &delta.files {
            if self.inner.entries.remove(name.as_str()).is_some() {
                tracing::debug!(file = %name, serial = delta.serial, "delta invalidated cached file");
            }
            if let Some(fetch) = pending.get(name.as_str()) {
                fetch.stale.store(true, Ordering::Release);
            }
        }
    }

    /// Apply every delta arriving on `deltas` until the channel closes.
    pub fn spawn_delta_listener(&self, mut deltas: mpsc::Receiver<DeltaSet>) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            while let Some(delta) = deltas.recv().await {
                cache.apply_delta(&delta);
            }
            tracing::debug!("delta channel closed");
        })
    }

    /// Fail every in-flight fetch with `ConnectionLost`.
    pub fn lost_connection(&self) {
        self.inner.lost_connection();
    }

    fn join_or_start(&self, name: &str) -> SharedFetch {
        let mut pending = self.inner.pending.lock();
        if let Some(fetch) = pending.get(name) {
            tracing::trace!(file = name, "joining in-flight fetch");
            return fetch.fetch.clone();
        }

        let name: Arc<str> = Arc::from(name);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let stale = Arc::new(AtomicBool::new(false));
        let (abort, registration) = AbortHandle::new_pair();

        let task = tokio::spawn(Abortable::new(
            fetch_and_install(
                Arc::clone(&self.inner),
                Arc::clone(&name),
                Arc::clone(&stale),
                id,
            ),
            registration,
        ));
        let fetch = async move {
            match task.await {
                Ok(Ok(result)) => result,
                // Only a lost connection aborts fetches.
                Ok(Err(_aborted)) => Err(FetchError::ConnectionLost),
                Err(_join) => Err(FetchError::Aborted),
            }
        }
        .boxed()
        .shared();

        pending.insert(
            name,
            Pending {
                fetch: fetch.clone(),
                abort,
                stale,
                id,
            },
        );
        fetch
    }
}

impl std::fmt::Debug for RemoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCache")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// Body of a spawned fetch task.
#[tracing::instrument(level = "debug", skip_all, fields(file = %name))]
async fn fetch_and_install(
    inner: Arc<Inner>,
    name: Arc<str>,
    stale: Arc<AtomicBool>,
    id: u64,
) -> FetchResult {
    let result = inner.fetch(&name, &stale).await;
    if matches!(result, Err(FetchError::ConnectionLost)) {
        inner.lost_connection();
    }
    inner.finish(&name, id);

    match &result {
        Ok(record) => tracing::debug!(phase = %FetchPhase::Complete, hash = ?record.hash),
        Err(err) => tracing::warn!(phase = %FetchPhase::Failed, error = %err, "fetch failed"),
    }
    result
}

impl Inner {
    async fn fetch(&self, name: &Arc<str>, stale: &AtomicBool) -> FetchResult {
        let mut sent = self.entries.get(&**name).map(|entry| entry.hash);

        loop {
            tracing::trace!(phase = %FetchPhase::RequestSent, cached = ?sent);
            let arg = GetFileArg {
                name: name.to_string(),
                cached: sent,
            };
            match self.transport.get_file(arg).await? {
                GetFileReply::Unchanged => {
                    let Some(hash) = sent else {
                        return Err(ProtocolError::UnexpectedUnchanged.into());
                    };
                    if let Some(record) = self.file_nochange(name, hash) {
                        tracing::trace!(phase = %FetchPhase::Cached);
                        return Ok(record);
                    }
                    // The entry went away while the request was out; ask
                    // again for the full file.
                    tracing::debug!("cached entry vanished, refetching");
                    sent = None;
                }
                GetFileReply::NotFound => {
                    self.cache_noent(name);
                    return Err(FetchError::NotFound(name.to_string()));
                }
                GetFileReply::FullBody { hash, body } => {
                    tracing::trace!(phase = %FetchPhase::Fetching, size = body.len());
                    let size = body.len() as u64;
                    if size > self.config.max_file_size {
                        return Err(ProtocolError::TooLarge {
                            size,
                            max: self.config.max_file_size,
                        }
                        .into());
                    }
                    let got = content_hash(&body);
                    if got != hash {
                        return Err(ProtocolError::FileHash {
                            expected: hash,
                            got,
                        }
                        .into());
                    }
                    return self.install(name, hash, &body, stale);
                }
                GetFileReply::Chunked(header) => {
                    tracing::trace!(phase = %FetchPhase::Fetching, size = header.total_size);
                    let body =
                        fetch_chunked(&*self.transport, &header, self.config.max_file_size).await?;
                    return self.install(name, header.file_hash, &body, stale);
                }
            }
        }
    }

    /// The cached record, if it is still the version we asked about.
    fn file_nochange(&self, name: &str, hash: ContentHash) -> Option<Arc<FileRecord>> {
        self.entries
            .get(name)
            .filter(|entry| entry.hash == hash)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn cache_noent(&self, name: &str) {
        if self.entries.remove(name).is_some() {
            tracing::debug!(file = name, "file gone from service, dropped cached copy");
        }
    }

    /// Decode and cache a verified body, replacing any previous version.
    fn install(
        &self,
        name: &Arc<str>,
        hash: ContentHash,
        body: &[u8],
        stale: &AtomicBool,
    ) -> FetchResult {
        let file = self.decoder.decode(name, body)?;
        let record = Arc::new(FileRecord::new(
            Arc::clone(name),
            file,
            body.len() as u64,
            hash,
        ));

        // Deltas are applied under the same lock, so a delta either lands
        // before this check or after the insert.
        let _pending = self.pending.lock();
        if stale.load(Ordering::Acquire) {
            tracing::debug!(file = %name, "invalidated during fetch, not caching");
        } else {
            self.entries.insert(Arc::clone(name), Arc::clone(&record));
        }
        Ok(record)
    }

    /// Drop the pending entry for fetch `id`, if it is still the current one.
    fn finish(&self, name: &str, id: u64) {
        let mut pending = self.pending.lock();
        if pending.get(name).is_some_and(|fetch| fetch.id == id) {
            pending.remove(name);
        }
    }

    fn lost_connection(&self) {
        let drained: Vec<Pending> = self.pending.lock().drain().map(|(_, fetch)| fetch).collect();
        if !drained.is_empty() {
            tracing::warn!(fetches = drained.len(), "connection lost, failing in-flight fetches");
        }
        for fetch in drained {
            fetch.abort.abort();
        }
    }
}

impl FileSource for RemoteCache {
    fn get_file<'a>(
        &'a self,
        name: &'a str,
    ) -> LocalBoxFuture<'a, Result<Arc<FileRecord>, SourceError>> {
        async move {
            RemoteCache::get_file(self, name)
                .await
                .map_err(|err| match err {
                    FetchError::NotFound(missing) => SourceError::NotFound(missing),
                    other => SourceError::Failed {
                        name: name.to_string(),
                        reason: other.to_string(),
                    },
                })
        }
        .boxed_local()
    }
}

/// Builder for `RemoteCache`.
pub struct RemoteCacheBuilder {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn FileDecoder>,
    config: CacheConfig,
}

impl RemoteCacheBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        RemoteCacheBuilder {
            transport,
            decoder: Arc::new(BincodeDecoder),
            config: CacheConfig::default(),
        }
    }

    /// Wire format decoder. Defaults to `BincodeDecoder`.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn FileDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_file_size(mut self, max_file_size: u64) -> Self {
        self.config.max_file_size = max_file_size;
        self
    }

    pub fn build(self) -> RemoteCache {
        RemoteCache {
            inner: Arc::new(Inner {
                transport: self.transport,
                decoder: self.decoder,
                config: self.config,
                entries: DashMap::new(),
                pending: Mutex::new(FxHashMap::default()),
                next_id: AtomicU64::new(0),
                delta_serial: AtomicU64::new(0),
            }),
        }
    }
}
