//! Runtime values produced by evaluation.
//!
//! # Sharing and Freezing
//!
//! Lists and dicts are shared, interior-mutable containers (`Shared<T>`).
//! Evaluating a reference to a list hands back the *same* list, so
//! `d.k = 1` mutates the binding in place. Anything that must outlive or be
//! decoupled from its scope goes through [`Value::freeze`], which deep-copies
//! every container. A frozen value never observes later mutation of the
//! environment it came from.
//!
//! Scalars, strings, lambdas and errors are immutable and cheap to clone.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;

use crate::{File, SourceLoc, StmtId};

/// Dict payload; ordered so that output is deterministic.
pub type Dict = BTreeMap<String, Value>;

/// Bindings captured by a lambda at creation time.
pub type Captures = FxHashMap<String, Value>;

/// Shared, interior-mutable container used for lists and dicts.
///
/// All construction goes through `Value::list`/`Value::dict`; cloning the
/// handle aliases the container, `Value::freeze` copies it.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Shared(Arc::new(RwLock::new(value)))
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Whether both handles point at the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0.read(), f)
    }
}

/// A closure: parameters, body, the file it was defined in, and a frozen
/// snapshot of the bindings visible where it was created.
pub struct LambdaValue {
    pub name: Option<Arc<str>>,
    pub params: Vec<String>,
    pub body: Vec<StmtId>,
    /// The body's statements live in this file's arena.
    pub file: Arc<File>,
    pub captured: Captures,
}

impl LambdaValue {
    /// Name for backtraces.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<lambda>")
    }
}

impl fmt::Debug for LambdaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaValue")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("file", &self.file.metadata.name)
            .finish_non_exhaustive()
    }
}

/// An evaluation error carried as a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorValue {
    pub message: String,
    pub location: Option<SourceLoc>,
}

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(Arc<str>),
    List(Shared<Vec<Value>>),
    Dict(Shared<Dict>),
    Lambda(Arc<LambdaValue>),
    Error(Arc<ErrorValue>),
}

impl Value {
    // Factory methods

    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Shared::new(items))
    }

    #[inline]
    pub fn dict(entries: Dict) -> Self {
        Value::Dict(Shared::new(entries))
    }

    #[inline]
    pub fn lambda(lambda: LambdaValue) -> Self {
        Value::Lambda(Arc::new(lambda))
    }

    pub fn error(message: impl Into<String>, location: Option<SourceLoc>) -> Self {
        Value::Error(Arc::new(ErrorValue {
            message: message.into(),
            location,
        }))
    }

    /// Deep copy: the result shares no container with `self`.
    ///
    /// Lambdas and errors are immutable and are shared as-is; lambda
    /// captures were frozen when the lambda was created.
    #[must_use]
    pub fn freeze(&self) -> Value {
        match self {
            Value::List(items) => Value::list(items.read().iter().map(Value::freeze).collect()),
            Value::Dict(entries) => Value::dict(
                entries
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.freeze()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Lambda(_) => "lambda",
            Value::Error(_) => "error",
        }
    }

    /// Template truthiness.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null | Value::Error(_) => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.read().is_empty(),
            Value::Dict(entries) => !entries.read().is_empty(),
            Value::Lambda(_) => true,
        }
    }

    /// Coerce to an unsigned integer; negative and non-numeric values fail.
    pub fn to_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::Bool(b) => Some(u64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a signed integer.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a double.
    #[expect(
        clippy::cast_precision_loss,
        reason = "template numbers follow C double semantics"
    )]
    pub fn to_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String form written to the output stream.
    pub fn to_str(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, false);
        out
    }

    fn render(&self, out: &mut String, nested: bool) {
        use fmt::Write;
        match self {
            Value::Null => {
                if nested {
                    out.push_str("null");
                }
            }
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Value::UInt(u) => {
                let _ = write!(out, "{u}");
            }
            Value::Double(d) => {
                let _ = write!(out, "{d}");
            }
            Value::Str(s) => {
                if nested {
                    quote_into(out, s);
                } else {
                    out.push_str(s);
                }
            }
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.read().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out, true);
                }
                out.push(']');
            }
            Value::Dict(entries) => {
                out.push('{');
                for (i, (k, v)) in entries.read().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    quote_into(out, k);
                    out.push_str(" : ");
                    v.render(out, true);
                }
                out.push('}');
            }
            Value::Lambda(l) => {
                let _ = write!(out, "<lambda {}>", l.display_name());
            }
            Value::Error(e) => out.push_str(&e.message),
        }
    }
}

fn quote_into(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::UInt(u) => write!(f, "UInt({u})"),
            Value::Double(d) => write!(f, "Double({d})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => write!(f, "List({items:?})"),
            Value::Dict(entries) => write!(f, "Dict({entries:?})"),
            Value::Lambda(l) => write!(f, "Lambda({})", l.display_name()),
            Value::Error(e) => write!(f, "Error({:?})", e.message),
        }
    }
}

/// Structural equality; lambdas compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Value::Dict(a), Value::Dict(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Value::Lambda(a), Value::Lambda(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
mod tests;
