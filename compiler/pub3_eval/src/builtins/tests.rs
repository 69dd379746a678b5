use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use pub3_ir::{FnContext, SourceLoc, Value};

#[derive(Default)]
struct RecordingCx {
    errors: Vec<String>,
}

impl FnContext for RecordingCx {
    fn report_error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn location(&self) -> SourceLoc {
        SourceLoc::new("/test.html", 1)
    }
}

fn call(name: &str, args: Vec<Value>) -> (Value, Vec<String>) {
    let library = MathLibrary::new();
    let mut cx = RecordingCx::default();
    let result = match library.resolve(name, &[], 1) {
        Some(f) => f.call(&mut cx, args),
        None => panic!("`{name}` is not in the math library"),
    };
    (result, cx.errors)
}

#[test]
fn test_library_names() {
    let library = MathLibrary::new();
    let names = library.names();
    assert_eq!(names.len(), 21);
    for expected in ["rand", "bitwise_or", "bitwise_and", "atan2", "cmp_float"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_every_function_is_documented() {
    let library = MathLibrary::new();
    for name in library.names() {
        let doc = library
            .resolve(name, &[], 0)
            .and_then(|f| f.documentation().map(str::to_string));
        assert!(doc.is_some_and(|d| !d.is_empty()), "{name} has no documentation");
    }
}

#[test]
fn test_bitwise_or_folds_left() {
    let (v, errors) = call(
        "bitwise_or",
        vec![Value::UInt(1), Value::UInt(4), Value::UInt(256)],
    );
    assert_eq!(v, Value::UInt(1 | 4 | 256));
    assert!(errors.is_empty());
}

#[test]
fn test_bitwise_and_folds_left() {
    let (v, errors) = call("bitwise_and", vec![Value::UInt(5), Value::Int(347)]);
    assert_eq!(v, Value::UInt(5 & 347));
    assert!(errors.is_empty());
}

#[test]
fn test_bitwise_and_requires_two_args() {
    let (v, errors) = call("bitwise_and", vec![Value::UInt(5)]);
    assert_eq!(v, Value::Null);
    assert_eq!(errors, vec!["bitwise_and() takes 2 or more arguments"]);

    let (v, _) = call("bitwise_and", vec![]);
    assert_eq!(v, Value::Null);
}

#[test]
fn test_bitwise_or_reports_each_bad_argument() {
    let (v, errors) = call(
        "bitwise_or",
        vec![Value::UInt(1), Value::Null, Value::Int(-2)],
    );
    assert_eq!(v, Value::Null);
    assert_eq!(
        errors,
        vec![
            "argument 2 to bitwise_or() is null",
            "argument 3 to bitwise_or() is not a positive int",
        ]
    );
}

#[test]
fn test_shifts() {
    assert_eq!(
        call("bitwise_leftshift", vec![Value::UInt(1), Value::UInt(4)]).0,
        Value::UInt(16)
    );
    assert_eq!(
        call("bitwise_rightshift", vec![Value::UInt(16), Value::UInt(4)]).0,
        Value::UInt(1)
    );
    assert_eq!(
        call("bitwise_leftshift", vec![Value::UInt(1), Value::UInt(64)]).0,
        Value::UInt(0)
    );
    assert_eq!(
        call("bitwise_xor", vec![Value::UInt(6), Value::UInt(3)]).0,
        Value::UInt(5)
    );
}

#[test]
fn test_typed_coercion_from_strings() {
    let (v, errors) = call("sqrt", vec![Value::string("16")]);
    assert_eq!(v, Value::Double(4.0));
    assert!(errors.is_empty());
}

#[test]
fn test_typed_coercion_failure_reports_position() {
    let (v, errors) = call("pow", vec![Value::Double(2.0), Value::list(vec![])]);
    assert_eq!(v, Value::Null);
    assert_eq!(errors, vec!["argument 2 to pow() must be a float, got list"]);
}

#[test]
fn test_arity_error() {
    let (v, errors) = call("atan2", vec![Value::Double(1.0)]);
    assert_eq!(v, Value::Null);
    assert_eq!(errors, vec!["atan2() takes 2 arguments"]);

    let (_, errors) = call("rand", vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]);
    assert_eq!(errors, vec!["rand() takes 0 to 2 arguments"]);
}

#[test]
fn test_cmp_float() {
    assert_eq!(call("cmp_float", vec![Value::Double(0.5)]).0, Value::Int(1));
    assert_eq!(call("cmp_float", vec![Value::Int(-3)]).0, Value::Int(-1));
    assert_eq!(call("cmp_float", vec![Value::Double(0.0)]).0, Value::Int(0));
}

#[test]
fn test_rounding() {
    assert_eq!(call("round", vec![Value::Double(2.5)]).0, Value::Double(3.0));
    assert_eq!(call("ceil", vec![Value::Double(2.1)]).0, Value::Double(3.0));
    assert_eq!(call("floor", vec![Value::Double(-2.1)]).0, Value::Double(-3.0));
}

#[test]
fn test_rand_default_range() {
    for _ in 0..50 {
        let (v, errors) = call("rand", vec![]);
        assert!(errors.is_empty());
        assert!(matches!(v, Value::UInt(u) if u < 10), "{v:?}");
    }
}

#[test]
fn test_rand_empty_range_reports_and_falls_back() {
    let mut cx = RecordingCx::default();
    let v = rand_between(&mut cx, 20, 20, 123);
    assert!((20..30).contains(&v));
    assert_eq!(cx.errors, vec!["range for random must be greater than 0 (got 0)"]);

    let mut cx = RecordingCx::default();
    rand_between(&mut cx, 20, 15, 0);
    assert_eq!(cx.errors, vec!["range for random must be greater than 0 (got -5)"]);
}

#[test]
fn test_rand_range_wider_than_i64() {
    let mut cx = RecordingCx::default();
    assert_eq!(rand_between(&mut cx, 0, (1 << 63) + 5, 12_345), 12_345);
    assert_eq!(rand_between(&mut cx, 0, u64::MAX, u64::MAX - 1), u64::MAX - 1);
    assert_eq!(rand_between(&mut cx, 1 << 62, u64::MAX, 7), (1 << 62) + 7);
    assert!(cx.errors.is_empty());
}

#[test]
fn test_rand_inverted_range_near_max_is_clamped() {
    let lo = u64::MAX - 2;
    let mut cx = RecordingCx::default();
    let v = rand_between(&mut cx, lo, 0, 5);
    assert!(v >= lo);
    assert_eq!(
        cx.errors,
        vec![format!(
            "range for random must be greater than 0 (got -{lo})"
        )]
    );

    let mut cx = RecordingCx::default();
    assert_eq!(rand_between(&mut cx, u64::MAX, u64::MAX, 99), u64::MAX);
    assert_eq!(cx.errors.len(), 1);
}

proptest! {
    #[test]
    fn rand_stays_in_range(lo: u64, hi: u64, sample: u64) {
        prop_assume!(lo < hi);
        let mut cx = RecordingCx::default();
        let v = rand_between(&mut cx, lo, hi, sample);
        prop_assert!(lo <= v && v < hi);
        prop_assert!(cx.errors.is_empty());
    }

    #[test]
    fn rand_inverted_range_falls_back(lo: u64, below: u64, sample: u64) {
        let hi = lo.saturating_sub(below);
        let mut cx = RecordingCx::default();
        let v = rand_between(&mut cx, lo, hi, sample);
        prop_assert!(lo <= v && u128::from(v) < u128::from(lo) + 10);
        prop_assert_eq!(cx.errors.len(), 1);
    }

    #[test]
    fn bitwise_or_matches_operator(a: u64, b: u64, c: u64) {
        let mut cx = RecordingCx::default();
        let v = bitwise_or(&mut cx, &[Value::UInt(a), Value::UInt(b), Value::UInt(c)]);
        prop_assert_eq!(v, Value::UInt(a | b | c));
    }
}
