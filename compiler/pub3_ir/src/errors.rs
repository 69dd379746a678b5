//! Errors raised while building or mutating a file tree.

use thiserror::Error;

use crate::ExprId;

/// Failure of an `ExprArena` mutation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IrError {
    /// The call site was already resolved; its argument list is frozen.
    #[error("cannot add an argument to `{name}()` after it has been resolved")]
    AlreadyResolved { name: String },
    /// The target node is not a runtime function call.
    #[error("{id:?} is not a function call")]
    NotACall { id: ExprId },
}
