use super::*;
use pretty_assertions::assert_eq;
use pub3_ir::SourceLoc;

#[derive(Default)]
struct RecordingCx {
    errors: Vec<String>,
    undefined: Vec<String>,
}

impl FnContext for RecordingCx {
    fn report_error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn report_undefined_function(&mut self, name: &str) {
        self.undefined.push(name.to_string());
    }

    fn location(&self) -> SourceLoc {
        SourceLoc::new("/page.html", 12)
    }
}

#[derive(Debug)]
struct Constant(&'static str, i64);

impl RuntimeFn for Constant {
    fn name(&self) -> &str {
        self.0
    }

    fn call(&self, _cx: &mut dyn FnContext, _args: Vec<Value>) -> Value {
        Value::Int(self.1)
    }
}

struct HostFactory(i64);

impl RfnFactory for HostFactory {
    fn resolve(&self, name: &str, _args: &[ExprId], _line: Line) -> Option<FunctionHandle> {
        (name == "answer" || name == "sqrt").then(|| Arc::new(Constant("answer", self.0)) as FunctionHandle)
    }
}

#[test]
fn test_null_registry_resolves_to_error_fn() {
    let registry = RfnRegistry::null();
    let f = registry.resolve("missing", &[], 3);
    assert_eq!(f.name(), "missing");

    let mut cx = RecordingCx::default();
    let v = f.call(&mut cx, vec![]);
    assert_eq!(cx.undefined, vec!["missing"]);
    match v {
        Value::Error(e) => {
            assert_eq!(e.message, "undefined function `missing`");
            assert_eq!(e.location, Some(SourceLoc::new("/page.html", 12)));
        }
        other => panic!("expected error value, got {other:?}"),
    }
}

#[test]
fn test_builtins_resolve() {
    let registry = RfnRegistry::with_builtins();
    assert!(registry.lookup("sqrt", &[], 1).is_some());
    assert!(registry.lookup("nope", &[], 1).is_none());
    assert!(registry
        .documentation("bitwise_or")
        .is_some_and(|d| d.contains("bitwise OR")));
}

#[test]
fn test_factories_checked_in_order() {
    let mut registry = RfnRegistry::with_builtins();
    registry.push(HostFactory(42));

    let mut cx = RecordingCx::default();
    let answer = registry.resolve("answer", &[], 1).call(&mut cx, vec![]);
    assert_eq!(answer, Value::Int(42));

    // The math library was pushed first, so its sqrt wins.
    let sqrt = registry
        .resolve("sqrt", &[], 1)
        .call(&mut cx, vec![Value::Int(9)]);
    assert_eq!(sqrt, Value::Double(3.0));
}

#[test]
fn test_registry_ids_are_distinct() {
    let a = RfnRegistry::null();
    let b = RfnRegistry::null();
    assert_ne!(a.id(), b.id());

    let mut c = RfnRegistry::with_builtins();
    let before = c.id();
    c.push(HostFactory(1));
    assert_ne!(c.id(), before);
}

#[test]
fn test_default_report_undefined_uses_report_error() {
    struct Plain(Vec<String>);
    impl FnContext for Plain {
        fn report_error(&mut self, message: String) {
            self.0.push(message);
        }
        fn location(&self) -> SourceLoc {
            SourceLoc::new("/x", 1)
        }
    }

    let mut cx = Plain(Vec::new());
    ErrorFn::new("f").call(&mut cx, vec![]);
    assert_eq!(cx.0, vec!["undefined function `f`"]);
}

#[test]
fn test_signature_arity_messages() {
    assert_eq!(
        Signature::exact(&[ArgType::Double]).arity_message("sqrt"),
        "sqrt() takes 1 argument"
    );
    assert_eq!(
        Signature::optional(&[ArgType::UInt, ArgType::UInt], 0).arity_message("rand"),
        "rand() takes 0 to 2 arguments"
    );
}
