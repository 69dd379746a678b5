//! Control-flow signals and lambda activation records.
//!
//! The publish state holds exactly one *current* `ControlSignal`. Every
//! construct that owns a signal (a loop, a lambda call, a published file)
//! swaps a fresh one in on entry and swaps the saved one back on exit:
//!
//! - `break` and `continue` set flags on the current signal; the loop owning
//!   that signal consumes them, so they never leak past it.
//! - `return` sets the return value; it is forwarded outward when a loop
//!   restores its parent signal and is consumed at the lambda boundary.

use pub3_ir::Value;

/// Observable state of a control signal.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlState {
    Normal,
    Breaking,
    Continuing,
    Returning(Value),
}

/// Break/continue/return flags for one block owner.
#[derive(Debug, Default)]
pub struct ControlSignal {
    brk: bool,
    cont: bool,
    rtrn: Option<Value>,
}

impl ControlSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        if let Some(value) = &self.rtrn {
            ControlState::Returning(value.clone())
        } else if self.brk {
            ControlState::Breaking
        } else if self.cont {
            ControlState::Continuing
        } else {
            ControlState::Normal
        }
    }

    /// Whether the current block must stop executing statements.
    #[inline]
    pub fn interrupted(&self) -> bool {
        self.brk || self.cont || self.rtrn.is_some()
    }

    #[inline]
    pub fn is_returning(&self) -> bool {
        self.rtrn.is_some()
    }

    pub fn set_break(&mut self) {
        self.brk = true;
    }

    pub fn set_continue(&mut self) {
        self.cont = true;
    }

    pub fn set_return(&mut self, value: Value) {
        self.rtrn = Some(value);
    }

    pub fn take_return(&mut self) -> Option<Value> {
        self.rtrn.take()
    }

    /// End of a loop iteration: whether the loop stops.
    ///
    /// `continue` is cleared here; `break` and `return` stop the loop.
    pub fn handle_loop_iteration(&mut self) -> bool {
        self.cont = false;
        self.brk || self.rtrn.is_some()
    }

    /// End of a zone or file: `break`/`continue` outside any loop stop only
    /// the enclosing zone. Returns whether a `return` is still unwinding.
    pub fn handle_zone(&mut self) -> bool {
        self.brk = false;
        self.cont = false;
        self.rtrn.is_some()
    }

    /// Install a fresh signal, returning the one it replaces.
    #[must_use]
    pub fn enter(&mut self) -> ControlSignal {
        std::mem::take(self)
    }

    /// Reinstate `saved`. With `forward_return`, a pending `return` from the
    /// inner signal carries over into `saved`.
    pub fn restore(&mut self, saved: ControlSignal, forward_return: bool) {
        let inner = std::mem::replace(self, saved);
        if forward_return {
            if let Some(value) = inner.rtrn {
                self.rtrn = Some(value);
            }
        }
    }
}

/// Saved caller state for one lambda activation.
#[derive(Debug)]
pub struct LambdaState {
    pub(crate) env_depth: usize,
    pub(crate) old_control: ControlSignal,
    pub(crate) overflow: bool,
}

impl LambdaState {
    /// An activation that was refused because it would exceed the maximum
    /// call depth. Nothing was pushed for it.
    pub(crate) fn overflowed() -> Self {
        LambdaState {
            env_depth: 0,
            old_control: ControlSignal::new(),
            overflow: true,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        !self.overflow
    }
}
