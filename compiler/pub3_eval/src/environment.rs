//! Binding environment for a publish.
//!
//! Bindings live in a stack of tables owned by one publish. The bottom table
//! holds the publish globals; the process-wide universals sit behind all of
//! them and are shared by every publish.
//!
//! ```text
//!   [ lambda params ]  <- barrier
//!   [ loop scope    ]
//!   [ include scope ]
//!   [ globals       ]  <- frames[0]
//!   ( universals    )  shared, read-mostly
//! ```
//!
//! Lookup walks from the innermost table outward. A *barrier* table (pushed
//! for a lambda activation) ends the walk early: past it, lookup jumps
//! straight to the globals, so a lambda body never sees its caller's locals.
//! It sees its own captures instead, which are stored in the barrier table.

use std::sync::Arc;

use parking_lot::RwLock;
use pub3_ir::{Captures, Value};
use rustc_hash::FxHashMap;

/// One binding table.
pub type BindTab = FxHashMap<String, Value>;

/// Process-wide root table, visible from every scope unless shadowed.
#[derive(Clone, Default)]
pub struct Universals(Arc<RwLock<BindTab>>);

impl Universals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bindings. Values are frozen so no publish can mutate them in place.
    pub fn seed<I>(&self, bindings: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut table = self.0.write();
        for (name, value) in bindings {
            table.insert(name, value.freeze());
        }
    }

    pub fn insert(&self, name: impl Into<String>, value: &Value) {
        self.0.write().insert(name.into(), value.freeze());
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

impl std::fmt::Debug for Universals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Universals").field(&self.len()).finish()
    }
}

#[derive(Default)]
struct Frame {
    table: BindTab,
    barrier: bool,
}

/// Scope stack for one publish.
pub struct Environment {
    /// `frames[0]` is the globals table and is never popped.
    frames: Vec<Frame>,
    universals: Universals,
}

impl Environment {
    pub fn new(universals: Universals) -> Self {
        Environment {
            frames: vec![Frame::default()],
            universals,
        }
    }

    /// Number of tables on the stack, globals included.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn push_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Push a table that hides every non-global scope beneath it.
    pub fn push_barrier(&mut self, table: BindTab) {
        self.frames.push(Frame {
            table,
            barrier: true,
        });
    }

    /// Pop the innermost scope. The globals are never popped.
    #[inline]
    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Pop back down to `depth` tables (at least the globals remain).
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    /// Indices of the tables visible from the innermost scope, innermost first.
    fn visible(&self) -> impl Iterator<Item = usize> + '_ {
        let top = self.frames.len() - 1;
        let stop = (1..=top)
            .rev()
            .find(|&i| self.frames[i].barrier)
            .unwrap_or(1);
        (stop..=top).rev().chain(std::iter::once(0))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        for i in self.visible() {
            if let Some(value) = self.frames[i].table.get(name) {
                return Some(value.clone());
            }
        }
        self.universals.get(name)
    }

    /// Bind `name` in the innermost scope.
    #[inline]
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.table.insert(name.into(), value);
        }
    }

    /// Bind `name` in the globals table.
    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.frames[0].table.insert(name.into(), value);
    }

    /// Rebind the nearest visible `name`, or define it innermost if there is
    /// none. Universals are never written: assigning a universal's name
    /// shadows it in the innermost scope.
    pub fn assign(&mut self, name: &str, value: Value) {
        let found = self
            .visible()
            .find(|&i| self.frames[i].table.contains_key(name));
        match found {
            Some(i) => {
                self.frames[i].table.insert(name.to_string(), value);
            }
            None => self.define(name, value),
        }
    }

    /// Snapshot of every visible non-global binding, frozen, innermost
    /// shadowing outermost. Globals and universals stay live.
    pub fn capture(&self) -> Captures {
        let mut captured = Captures::default();
        for i in self.visible().filter(|&i| i != 0) {
            for (name, value) in &self.frames[i].table {
                captured
                    .entry(name.clone())
                    .or_insert_with(|| value.freeze());
            }
        }
        captured
    }

    /// The publish globals.
    pub fn globals(&self) -> &BindTab {
        &self.frames[0].table
    }

    pub fn universals(&self) -> &Universals {
        &self.universals
    }

    /// Consume the environment, keeping only the globals.
    pub fn into_globals(mut self) -> BindTab {
        std::mem::take(&mut self.frames[0].table)
    }
}

#[cfg(test)]
mod tests;
