//! pub3 IR - expression trees, runtime values and file records.
//!
//! This crate contains the data the pub3 runtime operates on:
//! - `ExprId`/`StmtId` indices into a per-file `ExprArena`
//! - Expression and statement nodes (`ExprKind`, `StmtKind`)
//! - Runtime `Value`s produced by evaluation
//! - `File` and `FileRecord`, the decoded form of a compiled template
//! - The `RuntimeFn` trait implemented by every callable runtime function
//!
//! # Design Philosophy
//!
//! - **Flatten Everything**: No `Box<Expr>`, nodes refer to each other by index.
//! - **Immutable Trees**: A `File` is never mutated once it leaves its builder,
//!   so a single `Arc<File>` is shared by every evaluator publishing it.
//! - **No Cycles**: Values never point back into an environment; closures hold
//!   a frozen snapshot of their captures.

mod arena;
mod ast;
mod errors;
mod expr_id;
mod file;
mod function;
mod loc;
mod value;

pub use arena::ExprArena;
pub use ast::{
    BinaryOp, CallSite, Expr, ExprKind, IfArm, LambdaDef, ResolverId, Stmt, StmtKind, UnaryOp,
};
pub use errors::IrError;
pub use expr_id::{ExprId, StmtId};
pub use file::{CacheKey, ContentHash, File, FileRecord, Metadata};
pub use function::{FnContext, FunctionHandle, RuntimeFn};
pub use loc::{Line, SourceLoc};
pub use value::{Captures, Dict, ErrorValue, LambdaValue, Shared, Value};
