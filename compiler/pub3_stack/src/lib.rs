//! Stack growth for deeply nested evaluation.
//!
//! Template expressions nest arbitrarily (`a[b[c[...]]]`, lambdas calling
//! lambdas), and the evaluator walks them recursively. Recursive entry points
//! wrap their body in [`ensure_sufficient_stack`] so a pathological template
//! grows the stack instead of overflowing it.
//!
//! On wasm the call is a passthrough.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if fewer than `RED_ZONE` bytes remain.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_depth(n: u32) -> u32 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { nested_depth(n - 1) + 1 })
    }

    #[test]
    fn test_passes_result_through() {
        let result: Result<u8, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        assert_eq!(nested_depth(200_000), 200_000);
    }
}
