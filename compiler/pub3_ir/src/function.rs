//! The runtime function interface.
//!
//! Every function a template can call by name implements `RuntimeFn`:
//! the math library, the "undefined function" stub, and anything a host
//! registers. Functions get evaluated arguments and a narrow context for
//! reporting errors; they never see the binding environment.

use std::fmt;
use std::sync::Arc;

use crate::{SourceLoc, Value};

/// Shared handle to a resolved runtime function.
pub type FunctionHandle = Arc<dyn RuntimeFn>;

/// What a runtime function can ask of the evaluator while it runs.
pub trait FnContext {
    /// Report a non-fatal error at the current location.
    fn report_error(&mut self, message: String);

    /// Report a call to a name no factory could resolve.
    fn report_undefined_function(&mut self, name: &str) {
        self.report_error(format!("undefined function `{name}`"));
    }

    /// The location of the call being evaluated.
    fn location(&self) -> SourceLoc;
}

/// A function callable from templates.
pub trait RuntimeFn: Send + Sync + fmt::Debug {
    /// The name templates call it by.
    fn name(&self) -> &str;

    /// User-facing documentation, if any.
    fn documentation(&self) -> Option<&str> {
        None
    }

    /// Run the function.
    ///
    /// Errors are reported through `cx` and turned into a `Null` (or `Error`)
    /// result; a runtime function never aborts evaluation.
    fn call(&self, cx: &mut dyn FnContext, args: Vec<Value>) -> Value;
}
