//! Expression evaluation.
//!
//! `eval` may hand back containers shared with the environment (a reference
//! to a list yields that list). `eval_freeze` deep-copies the result and is
//! used wherever a value is stored or crosses a call boundary.

use std::sync::Arc;

use pub3_ir::{BinaryOp, Dict, ExprId, ExprKind, File, FileRecord, FnContext, LambdaValue, SourceLoc, Value};
use pub3_stack::ensure_sufficient_stack;

use super::state::PublishState;
use super::{render, PublishStatus, Publisher};
use crate::environment::BindTab;
use crate::errors::{
    cannot_access_field, cannot_index, compile_error, evaluation, include_failed,
    index_out_of_bounds, invalid_assignment_target, non_integer_index, not_callable,
    undefined_function, EvalError, EvalErrorKind,
};
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::opts::PubOpts;
use crate::output::OutputSink;

/// Runs one publish.
pub(crate) struct Evaluator<'p> {
    pub(crate) publisher: &'p Publisher,
    pub(crate) sink: &'p OutputSink,
    pub(crate) state: PublishState,
}

impl<'p> Evaluator<'p> {
    pub(crate) fn new(publisher: &'p Publisher, sink: &'p OutputSink, entry: &str) -> Self {
        Evaluator {
            publisher,
            sink,
            state: PublishState::new(publisher.universals().clone(), entry),
        }
    }

    #[inline]
    pub(crate) fn opts(&self) -> PubOpts {
        self.publisher.opts()
    }

    /// Obtain and publish the entry file. `args` are bound in a scope above
    /// the globals for the duration of the publish.
    pub(crate) async fn publish_entry(
        &mut self,
        name: &str,
        args: Option<Dict>,
    ) -> Option<Arc<FileRecord>> {
        let record = match self.publisher.fetch(name).await {
            Ok(record) => record,
            Err(err) => {
                self.report(include_failed(name, &err));
                return None;
            }
        };

        let mut scoped = self.scoped();
        for (k, v) in args.unwrap_or_default() {
            scoped.state.env.define(k, v.freeze());
        }
        scoped.publish_file(Arc::clone(&record)).await;
        Some(record)
    }

    pub(crate) fn into_status(self) -> PublishStatus {
        PublishStatus {
            diagnostics: self.state.diagnostics,
        }
    }

    pub(crate) fn into_status_and_globals(self) -> (PublishStatus, BindTab) {
        let status = PublishStatus {
            diagnostics: self.state.diagnostics,
        };
        (status, self.state.env.into_globals())
    }

    /// Report an error at the current location: log it, render it into the
    /// output per the error mode, and record it.
    #[cold]
    pub(crate) fn report(&mut self, kind: EvalErrorKind) {
        let error = EvalError::new(kind)
            .at(self.state.location())
            .with_backtrace(self.state.backtrace());
        let opts = self.opts();
        if !opts.contains(PubOpts::OUTPUT_ERR_NOLOG) {
            tracing::warn!(error = %error, "publish error");
        }
        render::render_error(self.sink, &error, opts);
        self.state.diagnostics.push(error);
    }

    /// Report and yield an `Error` value carrying the same message.
    pub(crate) fn error_value(&mut self, kind: EvalErrorKind) -> Value {
        let message = kind.to_string();
        let location = self.state.location();
        self.report(kind);
        Value::error(message, Some(location))
    }

    #[inline]
    pub(crate) fn eval_freeze(&mut self, file: &Arc<File>, id: ExprId) -> Value {
        self.eval(file, id).freeze()
    }

    pub(crate) fn eval(&mut self, file: &Arc<File>, id: ExprId) -> Value {
        ensure_sufficient_stack(|| self.eval_inner(file, id))
    }

    fn eval_inner(&mut self, file: &Arc<File>, id: ExprId) -> Value {
        let expr = file.arena.expr(id);
        match &expr.kind {
            ExprKind::Null => Value::Null,
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::Int(i) => Value::Int(*i),
            ExprKind::UInt(u) => Value::UInt(*u),
            ExprKind::Double(d) => Value::Double(*d),
            ExprKind::Str(s) => Value::string(s.as_str()),
            ExprKind::List(items) => {
                let items = items.iter().map(|&e| self.eval_freeze(file, e)).collect();
                Value::list(items)
            }
            ExprKind::Dict(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, e)| (k.clone(), self.eval_freeze(file, *e)))
                    .collect();
                Value::dict(entries)
            }
            ExprKind::Ref(name) => self.state.env.lookup(name).unwrap_or_default(),
            ExprKind::Call(site) => self.eval_call(file, site),
            ExprKind::Invoke { callee, args } => {
                let callee = self.eval(file, *callee);
                match callee {
                    Value::Lambda(lambda) => {
                        let args = args.iter().map(|&a| self.eval_freeze(file, a)).collect();
                        self.call_lambda(&lambda, args)
                    }
                    other => self.error_value(not_callable(other.type_name())),
                }
            }
            ExprKind::Lambda(def) => Value::lambda(LambdaValue {
                name: def.name.as_deref().map(Arc::from),
                params: def.params.clone(),
                body: def.body.clone(),
                file: Arc::clone(file),
                captured: self.state.env.capture(),
            }),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(file, *op, *lhs, *rhs),
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(file, *operand);
                self.recover(evaluate_unary(*op, &operand))
            }
            ExprKind::Index { base, index } => {
                let base = self.eval(file, *base);
                let index = self.eval(file, *index);
                self.eval_index(&base, &index)
            }
            ExprKind::Field { base, name } => {
                let base = self.eval(file, *base);
                self.eval_field(&base, name)
            }
            ExprKind::Assign { target, value } => self.eval_assign(file, *target, *value),
            ExprKind::Error(message) => self.error_value(compile_error(message)),
        }
    }

    /// Report the error of a failed operation and continue with `Null`.
    fn recover(&mut self, result: Result<Value, EvalErrorKind>) -> Value {
        result.unwrap_or_else(|kind| {
            self.report(kind);
            Value::Null
        })
    }

    fn eval_binary(&mut self, file: &Arc<File>, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Value {
        let left = self.eval(file, lhs);
        match op {
            BinaryOp::And if !left.to_bool() => Value::Bool(false),
            BinaryOp::Or if left.to_bool() => Value::Bool(true),
            BinaryOp::And | BinaryOp::Or => Value::Bool(self.eval(file, rhs).to_bool()),
            _ => {
                let right = self.eval(file, rhs);
                self.recover(evaluate_binary(op, &left, &right))
            }
        }
    }

    /// `base[index]`. Missing keys and out-of-range positions are `Null`.
    fn eval_index(&mut self, base: &Value, index: &Value) -> Value {
        match base {
            Value::Null => Value::Null,
            Value::List(items) => match index.to_int() {
                Some(i) => {
                    let items = items.read();
                    list_position(i, items.len())
                        .and_then(|pos| items.get(pos).cloned())
                        .unwrap_or_default()
                }
                None => self.recover(Err(non_integer_index(index.type_name()))),
            },
            Value::Dict(entries) => entries
                .read()
                .get(index.to_str().as_str())
                .cloned()
                .unwrap_or_default(),
            other => self.recover(Err(cannot_index(other.type_name()))),
        }
    }

    fn eval_field(&mut self, base: &Value, name: &str) -> Value {
        match base {
            Value::Null => Value::Null,
            Value::Dict(entries) => entries.read().get(name).cloned().unwrap_or_default(),
            other => self.recover(Err(cannot_access_field(name, other.type_name()))),
        }
    }

    /// `target = value`. The stored value is frozen; container targets are
    /// mutated in place.
    fn eval_assign(&mut self, file: &Arc<File>, target: ExprId, value: ExprId) -> Value {
        let value = self.eval_freeze(file, value);
        match &file.arena.expr(target).kind {
            ExprKind::Ref(name) => {
                self.state.env.assign(name, value.clone());
            }
            ExprKind::Field { base, name } => match self.eval(file, *base) {
                Value::Dict(entries) => {
                    entries.write().insert(name.clone(), value.clone());
                }
                other => {
                    self.report(cannot_access_field(name, other.type_name()));
                    return Value::Null;
                }
            },
            ExprKind::Index { base, index } => {
                let base = self.eval(file, *base);
                let index = self.eval(file, *index);
                if let Err(kind) = store_indexed(&base, &index, value.clone()) {
                    self.report(kind);
                    return Value::Null;
                }
            }
            _ => {
                self.report(invalid_assignment_target());
                return Value::Null;
            }
        }
        value
    }
}

/// Position of index `i` in a list of `len`; negative indices count from
/// the end.
fn list_position(i: i64, len: usize) -> Option<usize> {
    if i >= 0 {
        usize::try_from(i).ok().filter(|&p| p < len)
    } else {
        let back = usize::try_from(i.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

fn store_indexed(base: &Value, index: &Value, value: Value) -> Result<(), EvalErrorKind> {
    match base {
        Value::List(items) => {
            let i = index
                .to_int()
                .ok_or_else(|| non_integer_index(index.type_name()))?;
            let mut items = items.write();
            let len = items.len();
            match list_position(i, len) {
                Some(pos) => items[pos] = value,
                // Writing one past the end appends.
                None if usize::try_from(i).is_ok_and(|p| p == len) => items.push(value),
                None => return Err(index_out_of_bounds(i, len)),
            }
            Ok(())
        }
        Value::Dict(entries) => {
            entries.write().insert(index.to_str(), value);
            Ok(())
        }
        other => Err(cannot_index(other.type_name())),
    }
}

impl FnContext for Evaluator<'_> {
    fn report_error(&mut self, message: String) {
        self.report(evaluation(message));
    }

    fn report_undefined_function(&mut self, name: &str) {
        self.report(undefined_function(name));
    }

    fn location(&self) -> SourceLoc {
        self.state.location()
    }
}
