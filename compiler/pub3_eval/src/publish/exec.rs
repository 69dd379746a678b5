//! Statement execution and file publishing.
//!
//! Statements run through one async executor. Only `include` and `load`
//! ever suspend (waiting on the `FileSource`); everything else completes on
//! the first poll, which is what lets lambda bodies reuse this executor
//! synchronously.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use pub3_ir::{Dict, ExprId, File, FileRecord, IfArm, StmtId, StmtKind, Value};

use super::evaluator::Evaluator;
use super::render::{collapse_whitespace, end_marker, start_marker};
use super::state::resolve_path;
use crate::errors::{
    for_requires_iterable, include_args_require_dict, include_failed, include_requires_string,
    non_blocking_include,
};
use crate::opts::PubOpts;

/// Files nested deeper than this are refused, which stops include cycles.
const MAX_FILE_DEPTH: usize = 64;

impl Evaluator<'_> {
    /// Publish a whole file: its own location frame, working directory and
    /// control signal. `break`/`continue` that escape every loop stop here.
    pub(crate) async fn publish_file(&mut self, record: Arc<FileRecord>) {
        let file = Arc::clone(&record.file);
        let opts = self.opts();

        if opts.contains(PubOpts::VERBOSE) {
            tracing::info!(file = %record.name, hash = ?record.hash, "publishing");
        }
        if opts.contains(PubOpts::IINFO) {
            self.sink.write_str(&start_marker(&record.name));
        }

        let old_cwd = self.state.set_cwd(file.metadata.dir());
        self.state.push_metadata(Arc::clone(&record.name), None);

        if opts.contains(PubOpts::NOPARSE) {
            self.output_literal_text(&file);
        } else {
            let saved = self.state.control.enter();
            self.exec_block(&file, &file.body).await;
            self.state.control.handle_zone();
            self.state.control.restore(saved, false);
        }

        self.state.pop_metadata();
        self.state.set_cwd(&old_cwd);

        if opts.contains(PubOpts::IINFO) {
            self.sink.write_str(&end_marker(&record.name));
        }
    }

    /// Run `body` until it ends or the current control signal interrupts it.
    pub(crate) fn exec_block<'a>(
        &'a mut self,
        file: &'a Arc<File>,
        body: &'a [StmtId],
    ) -> LocalBoxFuture<'a, ()> {
        async move {
            for &id in body {
                if self.state.control.interrupted() {
                    break;
                }
                self.exec_stmt(file, id).await;
            }
        }
        .boxed_local()
    }

    async fn exec_stmt(&mut self, file: &Arc<File>, id: StmtId) {
        let stmt = file.arena.stmt(id);
        self.state.set_line(stmt.line);

        match &stmt.kind {
            StmtKind::Text(text) => self.output_text(text),
            StmtKind::Print(exprs) => {
                for &expr in exprs {
                    let value = self.eval(file, expr);
                    // Errors were rendered when they were reported.
                    if !value.is_error() {
                        self.sink.write_str(&value.to_str());
                    }
                }
            }
            StmtKind::Expr(expr) => {
                self.eval(file, *expr);
            }
            StmtKind::Locals(bindings) => {
                for (name, expr) in bindings {
                    let value = self.eval_freeze(file, *expr);
                    self.state.env.define(name.clone(), value);
                }
            }
            StmtKind::Globals(bindings) => {
                for (name, expr) in bindings {
                    let value = self.eval_freeze(file, *expr);
                    self.state.env.define_global(name.clone(), value);
                }
            }
            StmtKind::Universals(bindings) => {
                for (name, expr) in bindings {
                    let value = self.eval(file, *expr);
                    self.state.env.universals().insert(name.clone(), &value);
                }
            }
            StmtKind::If { arms, otherwise } => self.exec_if(file, arms, otherwise.as_deref()).await,
            StmtKind::For {
                var,
                iter,
                body,
                empty,
            } => self.exec_for(file, var, *iter, body, empty.as_deref()).await,
            StmtKind::While { cond, body } => self.exec_while(file, *cond, body).await,
            StmtKind::Include { file: target, args } => {
                self.exec_include(file, *target, *args, true).await;
            }
            StmtKind::Load { file: target } => self.exec_include(file, *target, None, false).await,
            StmtKind::Break => self.state.control.set_break(),
            StmtKind::Continue => self.state.control.set_continue(),
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_freeze(file, *expr),
                    None => Value::Null,
                };
                self.state.control.set_return(value);
            }
            StmtKind::Zone { preserve_ws, body } => {
                let old = self.state.push_pws(*preserve_ws);
                self.exec_block(file, body).await;
                self.state.pop_pws(old);
            }
        }
    }

    async fn exec_if(&mut self, file: &Arc<File>, arms: &[IfArm], otherwise: Option<&[StmtId]>) {
        for arm in arms {
            if self.eval(file, arm.cond).to_bool() {
                self.exec_block(file, &arm.body).await;
                return;
            }
        }
        if let Some(body) = otherwise {
            self.exec_block(file, body).await;
        }
    }

    /// `for (var, seq)`. Lists yield their items, dicts yield `{key, value}`
    /// pairs in key order, `Null` yields nothing.
    async fn exec_for(
        &mut self,
        file: &Arc<File>,
        var: &str,
        iter: ExprId,
        body: &[StmtId],
        empty: Option<&[StmtId]>,
    ) {
        let seq = self.eval(file, iter);
        let items: Vec<Value> = match &seq {
            Value::Null => Vec::new(),
            Value::List(items) => items.read().clone(),
            Value::Dict(entries) => entries
                .read()
                .iter()
                .map(|(key, value)| {
                    let mut pair = Dict::new();
                    pair.insert("key".to_string(), Value::string(key.as_str()));
                    pair.insert("value".to_string(), value.clone());
                    Value::dict(pair)
                })
                .collect(),
            other => {
                self.report(for_requires_iterable(other.type_name()));
                return;
            }
        };

        if items.is_empty() {
            if let Some(empty) = empty {
                self.exec_block(file, empty).await;
            }
            return;
        }

        let saved = self.state.control.enter();
        {
            let mut scoped = self.scoped();
            for item in items {
                scoped.state.env.define(var, item);
                scoped.exec_block(file, body).await;
                if scoped.state.control.handle_loop_iteration() {
                    break;
                }
            }
        }
        self.state.control.restore(saved, true);
    }

    async fn exec_while(&mut self, file: &Arc<File>, cond: ExprId, body: &[StmtId]) {
        let saved = self.state.control.enter();
        {
            let mut scoped = self.scoped();
            while scoped.eval(file, cond).to_bool() {
                scoped.exec_block(file, body).await;
                if scoped.state.control.handle_loop_iteration() {
                    break;
                }
            }
        }
        self.state.control.restore(saved, true);
    }

    /// `include(path, args)` (fresh scope seeded with `args`) or `load(path)`
    /// (current scope). Relative paths resolve against the including file.
    async fn exec_include(
        &mut self,
        file: &Arc<File>,
        target: ExprId,
        args: Option<ExprId>,
        fresh_scope: bool,
    ) {
        let what = if fresh_scope { "include" } else { "load" };
        if self.state.lambda_depth > 0 {
            self.report(non_blocking_include(what));
            return;
        }

        let name = match self.eval(file, target) {
            Value::Str(name) => name,
            other => {
                self.report(include_requires_string(other.type_name()));
                return;
            }
        };
        let bindings = match args.map(|args| self.eval_freeze(file, args)) {
            None | Some(Value::Null) => Dict::new(),
            Some(Value::Dict(entries)) => entries.read().clone(),
            Some(other) => {
                self.report(include_args_require_dict(other.type_name()));
                return;
            }
        };

        let path = resolve_path(self.state.cwd(), &name);
        if self.state.loc_depth() >= MAX_FILE_DEPTH {
            self.report(include_failed(&path, "files nested too deeply"));
            return;
        }
        let record = match self.publisher.fetch(&path).await {
            Ok(record) => record,
            Err(err) => {
                self.report(include_failed(&path, &err));
                return;
            }
        };

        if fresh_scope {
            let mut scoped = self.scoped();
            for (k, v) in bindings {
                scoped.state.env.define(k, v);
            }
            scoped.publish_file(record).await;
        } else {
            self.publish_file(record).await;
        }
    }

    /// Literal text, whitespace-collapsed under `WSS` unless preserved.
    fn output_text(&self, text: &str) {
        if self.opts().contains(PubOpts::WSS) && !self.state.pws() {
            self.sink.write_str(&collapse_whitespace(text));
        } else {
            self.sink.write_str(text);
        }
    }

    /// `NOPARSE`: write the file's top-level text and nothing else.
    fn output_literal_text(&self, file: &File) {
        for &id in &file.body {
            if let StmtKind::Text(text) = &file.arena.stmt(id).kind {
                self.output_text(text);
            }
        }
    }
}
