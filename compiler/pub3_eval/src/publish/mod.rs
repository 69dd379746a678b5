//! The publish orchestrator.
//!
//! A `Publisher` is built once per process (or per configuration) and shared;
//! every `run` gets its own per-publish state: binding stack, control signal,
//! location stack and whitespace flag. Only the universals and the registry
//! are shared between concurrent publishes.
//!
//! Publishing is a single logical task that suspends whenever an include
//! needs its file from the `FileSource`. Expression evaluation, including
//! lambda bodies, never suspends.

mod call;
mod evaluator;
mod exec;
mod render;
mod scope_guard;
mod state;

use std::fmt;
use std::sync::Arc;

use pub3_ir::{Dict, ExprKind, FileRecord, SourceLoc, Value};

use crate::environment::Universals;
use crate::errors::{compile_error, include_failed, EvalError};
use crate::opts::PubOpts;
use crate::output::OutputSink;
use crate::registry::RfnRegistry;
use crate::source::{FileSource, Localizer, SourceError};

use evaluator::Evaluator;

pub use state::{resolve_path, RunLoc};

/// Lambda nesting allowed before a call fails with a control overflow.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Publisher settings.
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    pub opts: PubOpts,
    pub max_call_depth: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            opts: PubOpts::empty(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Diagnostics collected during one publish.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishStatus {
    pub diagnostics: Vec<EvalError>,
}

impl PublishStatus {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Rendered messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(EvalError::message).collect()
    }
}

/// Result of `Publisher::run`.
#[derive(Debug)]
pub struct PublishOutcome {
    pub status: PublishStatus,
    /// The entry file, when it could be obtained.
    pub file: Option<Arc<FileRecord>>,
}

/// Result of `Publisher::run_cfg`.
#[derive(Debug)]
pub struct CfgOutcome {
    pub status: PublishStatus,
    /// Globals the configuration file defined.
    pub globals: Dict,
}

/// Publishes template files.
pub struct Publisher {
    source: Arc<dyn FileSource>,
    registry: Arc<RfnRegistry>,
    universals: Universals,
    localizer: Option<Arc<dyn Localizer>>,
    config: PublisherConfig,
}

impl Publisher {
    pub fn builder(source: Arc<dyn FileSource>) -> PublisherBuilder {
        PublisherBuilder::new(source)
    }

    #[inline]
    pub fn universals(&self) -> &Universals {
        &self.universals
    }

    #[inline]
    pub fn registry(&self) -> &RfnRegistry {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    #[inline]
    pub fn opts(&self) -> PubOpts {
        self.config.opts
    }

    /// Publish `name` into `sink`, with `args` bound in the file's scope.
    ///
    /// Once the file is obtained the publish always runs to completion;
    /// errors along the way are rendered and collected in the status.
    #[tracing::instrument(level = "debug", skip(self, args, sink))]
    pub async fn run(&self, name: &str, args: Option<Dict>, sink: &OutputSink) -> PublishOutcome {
        let mut evaluator = Evaluator::new(self, sink, name);
        let file = evaluator.publish_entry(name, args).await;
        PublishOutcome {
            status: evaluator.into_status(),
            file,
        }
    }

    /// Publish a configuration file for its globals, discarding output.
    ///
    /// With `PubOpts::COPY_CONF` the collected globals are also copied into
    /// the universals.
    #[tracing::instrument(level = "debug", skip(self, args))]
    pub async fn run_cfg(&self, name: &str, args: Option<Dict>) -> CfgOutcome {
        let sink = OutputSink::Discard;
        let mut evaluator = Evaluator::new(self, &sink, name);
        evaluator.publish_entry(name, args).await;
        let (status, globals) = evaluator.into_status_and_globals();

        if self.opts().contains(PubOpts::COPY_CONF) {
            self.universals
                .seed(globals.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        CfgOutcome {
            status,
            globals: globals.into_iter().collect(),
        }
    }

    /// Obtain `name` and report any node the compiler could not build.
    pub async fn syntax_check(&self, name: &str) -> PublishStatus {
        let mut status = PublishStatus::default();
        match self.fetch(name).await {
            Ok(record) => {
                for (_, expr) in record.file.arena.iter_exprs() {
                    if let ExprKind::Error(message) = &expr.kind {
                        status.diagnostics.push(
                            EvalError::new(compile_error(message))
                                .at(SourceLoc::new(Arc::clone(&record.name), expr.line)),
                        );
                    }
                }
            }
            Err(err) => status
                .diagnostics
                .push(EvalError::new(include_failed(name, &err)).at(SourceLoc::new(name, 0))),
        }
        status
    }

    /// Obtain a file, trying its localized name first.
    ///
    /// A missing localized file falls back to the plain name unless the
    /// localizer is strict; a missing file falls back to the localizer's
    /// default "file not found" page when it has one.
    async fn fetch(&self, name: &str) -> Result<Arc<FileRecord>, SourceError> {
        let localizer = self
            .localizer
            .as_deref()
            .filter(|_| !self.opts().contains(PubOpts::NOLOCALE));

        let result = match localizer.and_then(|l| l.localize(name)) {
            Some(localized) => match self.source.get_file(&localized).await {
                Err(SourceError::NotFound(_)) if localizer.is_some_and(|l| !l.strict()) => {
                    tracing::debug!(name, %localized, "no localized file, using plain name");
                    self.source.get_file(name).await
                }
                other => other,
            },
            None => self.source.get_file(name).await,
        };

        match result {
            Err(SourceError::NotFound(missing)) => {
                match localizer.and_then(|l| l.default_fnf()) {
                    Some(fnf) if fnf != name => self.source.get_file(&fnf).await,
                    _ => Err(SourceError::NotFound(missing)),
                }
            }
            other => other,
        }
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .field("universals", &self.universals)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for `Publisher`.
pub struct PublisherBuilder {
    source: Arc<dyn FileSource>,
    registry: Option<Arc<RfnRegistry>>,
    universals: Universals,
    localizer: Option<Arc<dyn Localizer>>,
    config: PublisherConfig,
}

impl PublisherBuilder {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        PublisherBuilder {
            source,
            registry: None,
            universals: Universals::new(),
            localizer: None,
            config: PublisherConfig::default(),
        }
    }

    /// Function registry. Defaults to the null registry.
    #[must_use]
    pub fn registry(mut self, registry: RfnRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Share a registry with other publishers.
    #[must_use]
    pub fn shared_registry(mut self, registry: Arc<RfnRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an existing universals table.
    #[must_use]
    pub fn universals(mut self, universals: Universals) -> Self {
        self.universals = universals;
        self
    }

    /// Seed one universal binding.
    #[must_use]
    pub fn universal(self, name: impl Into<String>, value: &Value) -> Self {
        self.universals.insert(name, value);
        self
    }

    #[must_use]
    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    #[must_use]
    pub fn opts(mut self, opts: PubOpts) -> Self {
        self.config.opts = opts;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn config(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Publisher {
        Publisher {
            source: self.source,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(RfnRegistry::null())),
            universals: self.universals,
            localizer: self.localizer,
            config: self.config,
        }
    }
}
