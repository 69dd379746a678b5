//! pub3 Eval - template evaluator and publish orchestrator.
//!
//! This crate runs compiled pub3 templates (`pub3_ir::File`) and writes the
//! result into an `OutputSink`.
//!
//! # Architecture
//!
//! - `Publisher`: shared, built once; owns the universals, the function
//!   registry, the `FileSource` and the options. Each `run` gets its own
//!   per-publish state.
//! - `Environment`: scope stack of binding tables over the shared universals
//! - `ControlSignal`: break/continue/return flags, one current signal swapped
//!   in and out by loops, lambda calls and files
//! - `RfnRegistry`: resolves `name(args)` calls through `RfnFactory`s; the
//!   math library lives in `builtins`
//! - `evaluate_binary`/`evaluate_unary`: operator semantics on `Value`s
//!
//! Errors never abort a publish. They are reported at the current location,
//! rendered per `PubOpts`, and collected in the `PublishStatus`.

pub mod builtins;
mod control;
mod environment;
pub mod errors;
mod operators;
mod opts;
pub mod output;
mod publish;
pub mod registry;
pub mod source;

use std::sync::Once;

pub use control::{ControlSignal, ControlState, LambdaState};
pub use environment::{BindTab, Environment, Universals};
pub use errors::{EvalError, EvalErrorKind};
pub use operators::{compare, evaluate_binary, evaluate_unary, values_equal};
pub use opts::{ErrorMode, PubOpts};
pub use output::{BufferSink, OutputSink, SharedSink, StdoutSink};
pub use publish::{
    resolve_path, CfgOutcome, PublishOutcome, PublishStatus, Publisher, PublisherBuilder,
    PublisherConfig, RunLoc, DEFAULT_MAX_CALL_DEPTH,
};
pub use registry::{RfnFactory, RfnRegistry};
pub use source::{FileSource, Localizer, MemorySource, SourceError};

// Re-export the IR types hosts need to drive a publish
pub use pub3_ir::{Dict, File, FileRecord, Value};

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber for publish diagnostics.
///
/// Does nothing unless `RUST_LOG` is set (e.g. `RUST_LOG=pub3_eval=debug`),
/// and only ever installs once per process.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
