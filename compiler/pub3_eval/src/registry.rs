//! Runtime function registry.
//!
//! A call site `f(args)` is resolved on its first evaluation by asking each
//! registered `RfnFactory` in order; the first one that knows the name wins.
//! When none does, the call resolves to an `ErrorFn` stub, so unresolved
//! calls degrade to an error value instead of aborting the publish.
//!
//! The resolution is cached on the call site under the registry's id, so a
//! registry is never asked twice for the same node. Publishers with other
//! registries sharing the same parsed file resolve it for themselves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pub3_ir::{ExprId, FnContext, FunctionHandle, Line, ResolverId, RuntimeFn, Value};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

fn next_registry_id() -> ResolverId {
    NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Produces runtime functions by name.
pub trait RfnFactory: Send + Sync {
    /// The function `name` called with `args` at `line`, if this factory
    /// provides it.
    fn resolve(&self, name: &str, args: &[ExprId], line: Line) -> Option<FunctionHandle>;
}

/// Ordered set of function factories held by a publisher.
pub struct RfnRegistry {
    id: ResolverId,
    factories: Vec<Box<dyn RfnFactory>>,
}

impl Default for RfnRegistry {
    fn default() -> Self {
        RfnRegistry {
            id: next_registry_id(),
            factories: Vec::new(),
        }
    }
}

impl RfnRegistry {
    /// A registry that resolves nothing: every call is an undefined function.
    pub fn null() -> Self {
        Self::default()
    }

    /// A registry with the math library installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::null();
        registry.push(crate::builtins::MathLibrary::new());
        registry
    }

    /// Process-unique id keying the resolutions this registry caches on
    /// call sites. Changes whenever a factory is added.
    #[inline]
    pub fn id(&self) -> ResolverId {
        self.id
    }

    /// Add a factory. Factories pushed earlier take precedence.
    pub fn push(&mut self, factory: impl RfnFactory + 'static) {
        self.factories.push(Box::new(factory));
        self.id = next_registry_id();
    }

    /// Resolve `name`, falling back to the error stub.
    #[tracing::instrument(level = "trace", skip(self, args))]
    pub fn resolve(&self, name: &str, args: &[ExprId], line: Line) -> FunctionHandle {
        self.lookup(name, args, line).unwrap_or_else(|| {
            tracing::debug!(name, line, "unresolved runtime function");
            Arc::new(ErrorFn::new(name))
        })
    }

    /// Resolve `name` without the fallback.
    pub fn lookup(&self, name: &str, args: &[ExprId], line: Line) -> Option<FunctionHandle> {
        self.factories
            .iter()
            .find_map(|factory| factory.resolve(name, args, line))
    }

    /// Documentation of `name`, if some factory provides it and documents it.
    pub fn documentation(&self, name: &str) -> Option<String> {
        self.lookup(name, &[], 0)
            .and_then(|f| f.documentation().map(str::to_string))
    }
}

impl fmt::Debug for RfnRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RfnRegistry")
            .field("id", &self.id)
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Stand-in for a function no factory provides.
///
/// Reports the undefined name and evaluates to an `Error` value carrying the
/// message and the call's location.
#[derive(Debug)]
pub struct ErrorFn {
    name: String,
}

impl ErrorFn {
    pub fn new(name: impl Into<String>) -> Self {
        ErrorFn { name: name.into() }
    }
}

impl RuntimeFn for ErrorFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, cx: &mut dyn FnContext, _args: Vec<Value>) -> Value {
        cx.report_undefined_function(&self.name);
        Value::error(
            crate::errors::undefined_function(&self.name).to_string(),
            Some(cx.location()),
        )
    }
}

/// Numeric representation a typed argument is coerced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    UInt,
    Int,
    Double,
}

impl ArgType {
    fn describe(self) -> &'static str {
        match self {
            ArgType::UInt => "a positive int",
            ArgType::Int => "an int",
            ArgType::Double => "a float",
        }
    }

    fn coerce(self, value: &Value) -> Option<Arg> {
        match self {
            ArgType::UInt => value.to_uint().map(Arg::UInt),
            ArgType::Int => value.to_int().map(Arg::Int),
            ArgType::Double => value.to_double().map(Arg::Double),
        }
    }
}

/// A coerced argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Arg {
    UInt(u64),
    Int(i64),
    Double(f64),
}

impl Arg {
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "only reached on a signature mismatch; C conversion semantics"
    )]
    pub fn as_uint(self) -> u64 {
        match self {
            Arg::UInt(u) => u,
            Arg::Int(i) => i as u64,
            Arg::Double(d) => d as u64,
        }
    }

    #[expect(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        reason = "only reached on a signature mismatch; C conversion semantics"
    )]
    pub fn as_int(self) -> i64 {
        match self {
            Arg::UInt(u) => u as i64,
            Arg::Int(i) => i,
            Arg::Double(d) => d as i64,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "C conversion semantics"
    )]
    pub fn as_double(self) -> f64 {
        match self {
            Arg::UInt(u) => u as f64,
            Arg::Int(i) => i as f64,
            Arg::Double(d) => d,
        }
    }
}

/// Declared argument types of a fixed-arity function.
///
/// Parameters past `min_args` are optional.
#[derive(Clone, Copy, Debug)]
pub struct Signature {
    pub params: &'static [ArgType],
    pub min_args: usize,
}

impl Signature {
    pub const fn exact(params: &'static [ArgType]) -> Self {
        Signature {
            params,
            min_args: params.len(),
        }
    }

    pub const fn optional(params: &'static [ArgType], min_args: usize) -> Self {
        Signature { params, min_args }
    }

    fn arity_message(&self, name: &str) -> String {
        let max = self.params.len();
        let plural = if max == 1 { "" } else { "s" };
        if self.min_args == max {
            format!("{name}() takes {max} argument{plural}")
        } else {
            format!("{name}() takes {} to {max} argument{plural}", self.min_args)
        }
    }
}

/// Body of a typed function.
pub type TypedBody = fn(&mut dyn FnContext, &[Arg]) -> Value;

/// A fixed-arity function whose arguments are coerced at the call boundary.
///
/// Arity and coercion failures are reported (coercion failures by 1-based
/// position) and the call yields `Null`; the body only ever sees arguments
/// of the declared types.
pub struct TypedFn {
    name: &'static str,
    doc: &'static str,
    sig: Signature,
    body: TypedBody,
}

impl TypedFn {
    pub const fn new(name: &'static str, doc: &'static str, sig: Signature, body: TypedBody) -> Self {
        TypedFn {
            name,
            doc,
            sig,
            body,
        }
    }

    fn coerce_args(&self, cx: &mut dyn FnContext, args: &[Value]) -> Option<Vec<Arg>> {
        if args.len() < self.sig.min_args || args.len() > self.sig.params.len() {
            cx.report_error(self.sig.arity_message(self.name));
            return None;
        }
        let mut ok = true;
        let mut coerced = Vec::with_capacity(args.len());
        for (i, (value, ty)) in args.iter().zip(self.sig.params).enumerate() {
            match ty.coerce(value) {
                Some(arg) => coerced.push(arg),
                None => {
                    cx.report_error(format!(
                        "argument {} to {}() must be {}, got {}",
                        i + 1,
                        self.name,
                        ty.describe(),
                        value.type_name()
                    ));
                    ok = false;
                }
            }
        }
        ok.then_some(coerced)
    }
}

impl RuntimeFn for TypedFn {
    fn name(&self) -> &str {
        self.name
    }

    fn documentation(&self) -> Option<&str> {
        Some(self.doc)
    }

    fn call(&self, cx: &mut dyn FnContext, args: Vec<Value>) -> Value {
        match self.coerce_args(cx, &args) {
            Some(coerced) => (self.body)(cx, &coerced),
            None => Value::Null,
        }
    }
}

impl fmt::Debug for TypedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedFn")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
