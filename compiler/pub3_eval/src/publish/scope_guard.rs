//! Scope guard for the evaluator's binding stack.
//!
//! `ScopedEvaluator` pops the scope it pushed when dropped, so a scope opened
//! for an include, a loop or a published file is closed on every exit path.
//! It derefs to the evaluator, so all evaluator methods stay available.

use std::ops::{Deref, DerefMut};

use super::evaluator::Evaluator;

/// Pops one binding scope on drop.
pub(crate) struct ScopedEvaluator<'guard, 'p> {
    evaluator: &'guard mut Evaluator<'p>,
}

impl Drop for ScopedEvaluator<'_, '_> {
    fn drop(&mut self) {
        self.evaluator.state.env.pop_scope();
    }
}

impl<'p> Deref for ScopedEvaluator<'_, 'p> {
    type Target = Evaluator<'p>;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl<'p> Evaluator<'p> {
    /// Push a scope that is popped when the returned guard drops.
    pub(crate) fn scoped(&mut self) -> ScopedEvaluator<'_, 'p> {
        self.state.env.push_scope();
        ScopedEvaluator { evaluator: self }
    }
}
