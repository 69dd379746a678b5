//! Evaluation errors and their constructors.
//!
//! Nothing here aborts a publish: every error is reported at the current
//! location, rendered according to the error mode, collected in the
//! `PublishStatus`, and evaluation carries on with a `Null` or `Error` value.
//!
//! Message construction is centralized in the factory functions below so
//! that wording stays consistent across the evaluator.

use std::fmt;

use pub3_ir::{BinaryOp, SourceLoc, UnaryOp};
use thiserror::Error;

/// What went wrong.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    /// Bad operand type or arity.
    #[error("{0}")]
    Evaluation(String),
    /// A call no function factory could resolve.
    #[error("undefined function `{name}`")]
    UndefinedFunction { name: String },
    /// Lambda nesting exceeded the configured depth.
    #[error("maximum call depth ({max}) exceeded calling `{name}`")]
    ControlOverflow { name: String, max: usize },
    /// An include or load could not obtain its file.
    #[error("cannot publish `{name}`: {reason}")]
    IncludeFailed { name: String, reason: String },
    /// An include or load inside a lambda body, which must not suspend.
    #[error("`{what}` is not allowed inside a lambda body")]
    NonBlockingInclude { what: &'static str },
}

/// A reported error with its location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub location: Option<SourceLoc>,
    /// Enclosing locations, innermost first, excluding `location`.
    pub backtrace: Vec<SourceLoc>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError {
            kind,
            location: None,
            backtrace: Vec::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, location: SourceLoc) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Vec<SourceLoc>) -> Self {
        self.backtrace = backtrace;
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::error::Error for EvalError {}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

// Control flow and calls

#[cold]
pub fn undefined_function(name: &str) -> EvalErrorKind {
    EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
    }
}

#[cold]
pub fn control_overflow(name: &str, max: usize) -> EvalErrorKind {
    EvalErrorKind::ControlOverflow {
        name: name.to_string(),
        max,
    }
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("cannot call a value of type {type_name}"))
}

#[cold]
pub fn wrong_lambda_args(name: &str, expected: usize, got: usize) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!(
        "`{name}` takes {expected} argument{}, got {got}",
        if expected == 1 { "" } else { "s" }
    ))
}

// Includes

#[cold]
pub fn include_failed(name: &str, reason: impl fmt::Display) -> EvalErrorKind {
    EvalErrorKind::IncludeFailed {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cold]
pub fn non_blocking_include(what: &'static str) -> EvalErrorKind {
    EvalErrorKind::NonBlockingInclude { what }
}

#[cold]
pub fn include_requires_string(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("file name must be a string, got {type_name}"))
}

#[cold]
pub fn include_args_require_dict(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("include arguments must be a dict, got {type_name}"))
}

// Operators

#[cold]
pub fn binary_type_mismatch(op: BinaryOp, left: &str, right: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!(
        "cannot apply `{}` to {left} and {right}",
        op.as_symbol()
    ))
}

#[cold]
pub fn unary_type_mismatch(op: UnaryOp, operand: &str) -> EvalErrorKind {
    let symbol = match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
    };
    EvalErrorKind::Evaluation(format!("cannot apply `{symbol}` to {operand}"))
}

#[cold]
pub fn division_by_zero() -> EvalErrorKind {
    EvalErrorKind::Evaluation("division by zero".to_string())
}

#[cold]
pub fn modulo_by_zero() -> EvalErrorKind {
    EvalErrorKind::Evaluation("modulo by zero".to_string())
}

#[cold]
pub fn integer_overflow(op: BinaryOp) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("integer overflow in `{}`", op.as_symbol()))
}

// Containers

#[cold]
pub fn cannot_index(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("cannot index a value of type {type_name}"))
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("index {index} out of bounds for list of length {len}"))
}

#[cold]
pub fn non_integer_index(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("list index must be an integer, got {type_name}"))
}

#[cold]
pub fn cannot_access_field(field: &str, type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("cannot access field `{field}` on {type_name}"))
}

#[cold]
pub fn invalid_assignment_target() -> EvalErrorKind {
    EvalErrorKind::Evaluation("invalid assignment target".to_string())
}

#[cold]
pub fn for_requires_iterable(type_name: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("cannot iterate over a value of type {type_name}"))
}

#[cold]
pub fn compile_error(message: &str) -> EvalErrorKind {
    EvalErrorKind::Evaluation(format!("compile error: {message}"))
}

#[cold]
pub fn evaluation(message: impl Into<String>) -> EvalErrorKind {
    EvalErrorKind::Evaluation(message.into())
}
