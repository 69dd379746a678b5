//! Formatting of what a publish writes besides literal text and values:
//! rendered errors, file markers and whitespace-stripped text.

use std::borrow::Cow;
use std::fmt::Write;

use crate::errors::EvalError;
use crate::opts::{ErrorMode, PubOpts};
use crate::output::OutputSink;

/// Written in place of an error in placeholder mode.
pub(crate) const ERROR_PLACEHOLDER: &str = "[pub3 error]";

/// Write `error` to `sink` the way `opts` asks for.
pub(crate) fn render_error(sink: &OutputSink, error: &EvalError, opts: PubOpts) {
    let text = match opts.error_mode() {
        ErrorMode::Silent => return,
        ErrorMode::Placeholder => Cow::Borrowed(ERROR_PLACEHOLDER),
        ErrorMode::InPlace => {
            let plain = format!("[pub3 error: {}]", describe(error, opts));
            if opts.contains(PubOpts::VISERR) {
                Cow::Owned(format!(
                    "<span style=\"color:red;font-weight:bold\">{}</span>",
                    escape_html(&plain)
                ))
            } else {
                Cow::Owned(plain)
            }
        }
        ErrorMode::Comment => Cow::Owned(format!(
            "<!-- pub3 error: {} -->",
            describe(error, opts).replace("--", "- -")
        )),
    };
    sink.write_str(&text);
}

/// The message with its location, plus the backtrace under `DEBUG`.
fn describe(error: &EvalError, opts: PubOpts) -> String {
    let mut out = error.to_string();
    if opts.contains(PubOpts::DEBUG) {
        for frame in &error.backtrace {
            let _ = write!(out, "; from {frame}");
        }
    }
    out
}

pub(crate) fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Collapse every run of whitespace to a single space.
pub(crate) fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_whitespace() && w[1].is_ascii_whitespace())
        || text.contains(['\n', '\t', '\r']);
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    Cow::Owned(out)
}

pub(crate) fn start_marker(name: &str) -> String {
    format!("<!-- START: {name} -->")
}

pub(crate) fn end_marker(name: &str) -> String {
    format!("<!-- END: {name} -->")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  b\n\n\tc"), "a b c");
        assert_eq!(collapse_whitespace("  lead"), " lead");
        assert_eq!(collapse_whitespace("one two"), "one two");
        assert!(matches!(collapse_whitespace("one two"), Cow::Borrowed(_)));
        assert_eq!(collapse_whitespace("x\ny"), "x y");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert!(matches!(escape_html("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_markers() {
        assert_eq!(start_marker("/a.html"), "<!-- START: /a.html -->");
        assert_eq!(end_marker("/a.html"), "<!-- END: /a.html -->");
    }
}
