//! Built-in runtime function libraries.

mod math;

use pub3_ir::{ExprId, FunctionHandle, Line};
use rustc_hash::FxHashMap;

use crate::registry::RfnFactory;

pub use math::{bitwise_and, bitwise_or, rand_between};

/// The math and bitwise library.
///
/// Every function is stateless, so one handle per name is shared by every
/// call site resolving to it.
pub struct MathLibrary {
    functions: FxHashMap<String, FunctionHandle>,
}

impl MathLibrary {
    pub fn new() -> Self {
        let functions = math::functions()
            .into_iter()
            .map(|f| (f.name().to_string(), f))
            .collect();
        MathLibrary { functions }
    }

    /// Names of every function in the library, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for MathLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl RfnFactory for MathLibrary {
    fn resolve(&self, name: &str, _args: &[ExprId], _line: Line) -> Option<FunctionHandle> {
        self.functions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests;
