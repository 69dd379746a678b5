//! Math and bitwise functions.
//!
//! Fixed-arity functions go through `TypedFn`, which coerces their arguments
//! before the body runs. `bitwise_or` and `bitwise_and` are variadic and do
//! their own per-argument checking.

use std::sync::Arc;

use pub3_ir::{FnContext, FunctionHandle, RuntimeFn, Value};

use crate::registry::{Arg, ArgType, Signature, TypedFn};

/// Range used by `rand()` with no arguments, and as the fallback width when
/// the requested range is empty.
const DEFAULT_RAND_RANGE: u64 = 10;

const F: ArgType = ArgType::Double;
const U: ArgType = ArgType::UInt;

pub(super) fn functions() -> Vec<FunctionHandle> {
    let typed: [TypedFn; 19] = [
        TypedFn::new("rand", RAND_DOC, Signature::optional(&[U, U], 0), rand),
        TypedFn::new("cmp_float", CMP_FLOAT_DOC, Signature::exact(&[F]), cmp_float),
        TypedFn::new("round", ROUND_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::round)
        }),
        TypedFn::new("exp", EXP_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::exp)
        }),
        TypedFn::new("log", LOG_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::ln)
        }),
        TypedFn::new("sqrt", SQRT_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::sqrt)
        }),
        TypedFn::new("cos", COS_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::cos)
        }),
        TypedFn::new("sin", SIN_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::sin)
        }),
        TypedFn::new("tan", TAN_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::tan)
        }),
        TypedFn::new("asin", ASIN_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::asin)
        }),
        TypedFn::new("acos", ACOS_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::acos)
        }),
        TypedFn::new("atan", ATAN_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::atan)
        }),
        TypedFn::new("atan2", ATAN2_DOC, Signature::exact(&[F, F]), |_, a| {
            Value::Double(a[0].as_double().atan2(a[1].as_double()))
        }),
        TypedFn::new("pow", POW_DOC, Signature::exact(&[F, F]), |_, a| {
            Value::Double(a[0].as_double().powf(a[1].as_double()))
        }),
        TypedFn::new("ceil", CEIL_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::ceil)
        }),
        TypedFn::new("floor", FLOOR_DOC, Signature::exact(&[F]), |_, a| {
            unary_f64(a, f64::floor)
        }),
        TypedFn::new("bitwise_xor", BITWISE_XOR_DOC, Signature::exact(&[U, U]), |_, a| {
            Value::UInt(a[0].as_uint() ^ a[1].as_uint())
        }),
        TypedFn::new(
            "bitwise_leftshift",
            BITWISE_LEFTSHIFT_DOC,
            Signature::exact(&[U, U]),
            |_, a| Value::UInt(shift(a[0].as_uint(), a[1].as_uint(), u64::checked_shl)),
        ),
        TypedFn::new(
            "bitwise_rightshift",
            BITWISE_RIGHTSHIFT_DOC,
            Signature::exact(&[U, U]),
            |_, a| Value::UInt(shift(a[0].as_uint(), a[1].as_uint(), u64::checked_shr)),
        ),
    ];

    let mut all: Vec<FunctionHandle> = typed
        .into_iter()
        .map(|f| Arc::new(f) as FunctionHandle)
        .collect();
    all.push(Arc::new(BitwiseFold::OR));
    all.push(Arc::new(BitwiseFold::AND));
    all
}

#[inline]
fn unary_f64(args: &[Arg], f: fn(f64) -> f64) -> Value {
    Value::Double(f(args[0].as_double()))
}

/// Shifts of 64 bits or more shift everything out.
#[inline]
fn shift(base: u64, by: u64, op: fn(u64, u32) -> Option<u64>) -> u64 {
    u32::try_from(by)
        .ok()
        .and_then(|by| op(base, by))
        .unwrap_or(0)
}

fn cmp_float(_cx: &mut dyn FnContext, args: &[Arg]) -> Value {
    let d = args[0].as_double();
    let ord = if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    };
    Value::Int(ord)
}

fn rand(cx: &mut dyn FnContext, args: &[Arg]) -> Value {
    let (lo, hi) = match args {
        [] => (0, DEFAULT_RAND_RANGE),
        [hi] => (0, hi.as_uint()),
        [lo, hi, ..] => (lo.as_uint(), hi.as_uint()),
    };
    let sample = match getrandom::u64() {
        Ok(sample) => sample,
        Err(err) => {
            tracing::warn!(%err, "system random source unavailable");
            0
        }
    };
    Value::UInt(rand_between(cx, lo, hi, sample))
}

/// Map `sample` into `[lo, hi)`.
///
/// An empty or inverted range is reported and replaced by
/// `[lo, lo + DEFAULT_RAND_RANGE)`, clamped at `u64::MAX`, so the template
/// keeps rendering. Bounds are compared as unsigned over the full `u64`
/// domain.
pub fn rand_between(cx: &mut dyn FnContext, lo: u64, hi: u64, sample: u64) -> u64 {
    let hi = if hi > lo {
        hi
    } else {
        let width = i128::from(hi) - i128::from(lo);
        cx.report_error(format!(
            "range for random must be greater than 0 (got {width})"
        ));
        lo.saturating_add(DEFAULT_RAND_RANGE)
    };
    match hi - lo {
        0 => lo,
        range => lo + sample % range,
    }
}

/// Variadic bitwise fold over two or more unsigned arguments.
#[derive(Debug)]
struct BitwiseFold {
    name: &'static str,
    doc: &'static str,
    init: u64,
    op: fn(u64, u64) -> u64,
}

impl BitwiseFold {
    const OR: BitwiseFold = BitwiseFold {
        name: "bitwise_or",
        doc: BITWISE_OR_DOC,
        init: 0,
        op: <u64 as std::ops::BitOr>::bitor,
    };

    const AND: BitwiseFold = BitwiseFold {
        name: "bitwise_and",
        doc: BITWISE_AND_DOC,
        init: u64::MAX,
        op: <u64 as std::ops::BitAnd>::bitand,
    };

    /// Fold `args` left to right. Every bad argument is reported; any error
    /// makes the whole call `Null`.
    fn fold(&self, cx: &mut dyn FnContext, args: &[Value]) -> Value {
        if args.len() < 2 {
            cx.report_error(format!("{}() takes 2 or more arguments", self.name));
            return Value::Null;
        }
        let mut ok = true;
        let mut acc = self.init;
        for (i, arg) in args.iter().enumerate() {
            let pos = i + 1;
            if arg.is_null() {
                cx.report_error(format!("argument {pos} to {}() is null", self.name));
                ok = false;
            } else if let Some(u) = arg.to_uint() {
                acc = (self.op)(acc, u);
            } else {
                cx.report_error(format!(
                    "argument {pos} to {}() is not a positive int",
                    self.name
                ));
                ok = false;
            }
        }
        if ok {
            Value::UInt(acc)
        } else {
            Value::Null
        }
    }
}

impl RuntimeFn for BitwiseFold {
    fn name(&self) -> &str {
        self.name
    }

    fn documentation(&self) -> Option<&str> {
        Some(self.doc)
    }

    fn call(&self, cx: &mut dyn FnContext, args: Vec<Value>) -> Value {
        self.fold(cx, &args)
    }
}

pub fn bitwise_or(cx: &mut dyn FnContext, args: &[Value]) -> Value {
    BitwiseFold::OR.fold(cx, args)
}

pub fn bitwise_and(cx: &mut dyn FnContext, args: &[Value]) -> Value {
    BitwiseFold::AND.fold(cx, args)
}

const RAND_DOC: &str = "Outputs a random number.

Given one argument (`a1`), outputs an integer randomly between 0 and `a1`.

Given two (`a1` and `a2`), outputs an integer randomly between `a1` and `a2`.
@param {uint} a1
@optional
@param {uint} a2
@example rand(100)";

const CMP_FLOAT_DOC: &str = "Compare `a` to `0`

@param {float} a
@return {int} `1` if `a > 0`; `-1` if `a < 0`; `0` otherwise";

const ROUND_DOC: &str = "Round `f` to the nearest integer.

@param {float} f
@return {int}";

const EXP_DOC: &str = "The C-library exp() function

@param {float} f
@return {float}";

const LOG_DOC: &str = "The C-library log() function.

@param {float} f
@return {float}";

const SQRT_DOC: &str = "The C-library sqrt() function.

@param {float} f
@return {float}";

const COS_DOC: &str = "The C-library cos() function, input in radians.

@param {float} f
@return {float}";

const SIN_DOC: &str = "The C-library sin() function, input in radians.

@param {float} f
@return {float}";

const TAN_DOC: &str = "The C-library tan() function, input in radians.

@param {float} f
@return {float}";

const ASIN_DOC: &str = "The C-library asin() function, output in radians.

@param {float} f
@return {float}";

const ACOS_DOC: &str = "The C-library acos() function, output in radians.

@param {float} f
@return {float}";

const ATAN_DOC: &str = "The C-library atan() function, output in radians.

@param {float} f
@return {float}";

const ATAN2_DOC: &str = "The C-library atan2() function, output in radians.

@param {float} y
@param {float} x
@return {float}";

const POW_DOC: &str = "The C-library pow() function.

@param {float} base
@param {float} exponent
@return {float}";

const CEIL_DOC: &str = "Return the smallest integer `i` such that `i >= f`

@param {float} f
@return {int}";

const FLOOR_DOC: &str = "Return the largest integer `i` such that `i <= f`.

@param {float} f
@return {int}";

const BITWISE_XOR_DOC: &str = "Compute the bitwise XOR of `a1` and `a2`.

@param {uint} a1
@param {uint} a2
@return {uint}";

const BITWISE_LEFTSHIFT_DOC: &str = "Shift the `base` value `shift` bits to the left

@param {uint} base
@param {uint} shift
@return {uint}
@example bitwise_leftshift(1, 4)";

const BITWISE_RIGHTSHIFT_DOC: &str = "Shift the `base` value `shift` bits to the right

@param {uint} base
@param {uint} shift
@return {uint}
@example bitwise_rightshift(16, 4)";

const BITWISE_OR_DOC: &str = "Compute the bitwise OR of the arguments.

Can take arbitrarily many arguments.
@param {uint} arg1
@param {uint} arg2
@optional
@param {uint...} args
@return {uint}
@example bitwise_or(1, 4, 256)";

const BITWISE_AND_DOC: &str = "Compute the bitwise AND of the arguments.

Can take arbitrarily many arguments.
@param {uint} arg1
@param {uint} arg2
@optional
@param {uint...} args
@return {uint}
@example bitwise_and(5, 347)";
