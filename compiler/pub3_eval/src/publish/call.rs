//! Calls: named runtime functions and lambda activations.

use std::sync::Arc;

use futures::FutureExt;
use pub3_ir::{CallSite, File, LambdaValue, Value};

use super::evaluator::Evaluator;
use crate::control::LambdaState;
use crate::environment::BindTab;
use crate::errors::{control_overflow, evaluation, wrong_lambda_args};

impl Evaluator<'_> {
    /// `name(args)`: a lambda bound to `name` wins over the registry.
    ///
    /// Registry resolution happens once per call site and registry, and is
    /// cached on the site.
    pub(crate) fn eval_call(&mut self, file: &Arc<File>, site: &CallSite) -> Value {
        self.state.set_line(site.line);

        if let Some(Value::Lambda(lambda)) = self.state.env.lookup(&site.name) {
            let args = self.eval_args(file, site);
            return self.call_lambda(&lambda, args);
        }

        let registry = self.publisher.registry();
        let function = site.resolve_with(registry.id(), |name, args, line| {
            registry.resolve(name, args, line)
        });
        let args = self.eval_args(file, site);
        function.call(self, args)
    }

    fn eval_args(&mut self, file: &Arc<File>, site: &CallSite) -> Vec<Value> {
        site.args()
            .iter()
            .map(|&arg| self.eval_freeze(file, arg))
            .collect()
    }

    /// Run a lambda with already-frozen arguments.
    ///
    /// The body runs behind a barrier scope holding the captures and the
    /// parameters, with a fresh control signal. An activation that would
    /// exceed the maximum call depth is refused: the error is reported and
    /// returned as a value, and no stack is touched.
    #[tracing::instrument(level = "trace", skip_all, fields(lambda = lambda.display_name()))]
    pub(crate) fn call_lambda(&mut self, lambda: &Arc<LambdaValue>, args: Vec<Value>) -> Value {
        let name = lambda.display_name();
        if args.len() > lambda.params.len() {
            return self.error_value(wrong_lambda_args(name, lambda.params.len(), args.len()));
        }

        let mut bindings: BindTab = lambda
            .captured
            .iter()
            .map(|(k, v)| (k.clone(), v.freeze()))
            .collect();
        let mut args = args.into_iter();
        for param in &lambda.params {
            bindings.insert(param.clone(), args.next().unwrap_or_default());
        }

        let activation = self.push_lambda_call(&lambda.file, name, bindings);
        if !activation.is_ok() {
            let max = self.publisher.config().max_call_depth;
            return self.error_value(control_overflow(name, max));
        }

        // Includes are refused inside lambda bodies, so the body future
        // completes on its first poll.
        if self.exec_block(&lambda.file, &lambda.body).now_or_never().is_none() {
            self.report(evaluation(format!("`{name}` suspended while running")));
        }

        self.pop_lambda_call(activation)
    }

    /// Enter a lambda activation: barrier scope, location frame and a fresh
    /// control signal. Refused (nothing pushed) past the maximum depth.
    pub(crate) fn push_lambda_call(&mut self, file: &File, name: &str, bindings: BindTab) -> LambdaState {
        if self.state.lambda_depth >= self.publisher.config().max_call_depth {
            return LambdaState::overflowed();
        }
        let env_depth = self.state.env.depth();
        self.state.env.push_barrier(bindings);
        self.state
            .push_metadata(Arc::from(file.name()), Some(Arc::from(name)));
        self.state.lambda_depth += 1;
        LambdaState {
            env_depth,
            old_control: self.state.control.enter(),
            overflow: false,
        }
    }

    /// Leave a lambda activation, restoring the caller's scopes and control
    /// signal. Yields the returned value, or `Null` without a `return`.
    pub(crate) fn pop_lambda_call(&mut self, activation: LambdaState) -> Value {
        if !activation.is_ok() {
            return Value::Null;
        }
        let returned = self.state.control.take_return();
        self.state.control.restore(activation.old_control, false);
        self.state.env.truncate(activation.env_depth);
        self.state.pop_metadata();
        self.state.lambda_depth -= 1;
        returned.unwrap_or_default()
    }
}
