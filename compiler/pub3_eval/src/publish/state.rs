//! Per-publish state.

use std::sync::Arc;

use pub3_ir::{Line, SourceLoc};
use smallvec::SmallVec;

use crate::control::ControlSignal;
use crate::environment::{Environment, Universals};
use crate::errors::EvalError;

/// One frame of the location stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLoc {
    pub file: Arc<str>,
    /// The lambda being run, if any.
    pub func: Option<Arc<str>>,
    pub line: Line,
}

impl RunLoc {
    pub fn new(file: Arc<str>, func: Option<Arc<str>>) -> Self {
        RunLoc {
            file,
            func,
            line: 0,
        }
    }

    pub fn to_source_loc(&self) -> SourceLoc {
        SourceLoc {
            file: Arc::clone(&self.file),
            func: self.func.clone(),
            line: self.line,
        }
    }
}

/// Everything one publish owns. Nothing here is shared with another publish.
pub(crate) struct PublishState {
    pub(crate) env: Environment,
    pub(crate) control: ControlSignal,
    /// File and lambda frames, entry file at the bottom.
    locs: SmallVec<[RunLoc; 4]>,
    entry: Arc<str>,
    /// Preserve whitespace in literal text.
    pws: bool,
    /// Directory of the file being published; relative includes resolve here.
    cwd: String,
    /// Active lambda activations.
    pub(crate) lambda_depth: usize,
    pub(crate) diagnostics: Vec<EvalError>,
}

impl PublishState {
    pub(crate) fn new(universals: Universals, entry: &str) -> Self {
        PublishState {
            env: Environment::new(universals),
            control: ControlSignal::new(),
            locs: SmallVec::new(),
            entry: Arc::from(entry),
            pws: false,
            cwd: String::new(),
            lambda_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn push_metadata(&mut self, file: Arc<str>, func: Option<Arc<str>>) {
        self.locs.push(RunLoc::new(file, func));
    }

    /// Pop a frame; the entry file's frame is never popped.
    pub(crate) fn pop_metadata(&mut self) {
        if self.locs.len() > 1 {
            self.locs.pop();
        }
    }

    pub(crate) fn set_line(&mut self, line: Line) {
        if let Some(top) = self.locs.last_mut() {
            top.line = line;
        }
    }

    pub(crate) fn loc_depth(&self) -> usize {
        self.locs.len()
    }

    /// Current location.
    pub(crate) fn location(&self) -> SourceLoc {
        match self.locs.last() {
            Some(top) => top.to_source_loc(),
            None => SourceLoc::new(Arc::clone(&self.entry), 0),
        }
    }

    /// Enclosing frames, innermost first, excluding the current one.
    pub(crate) fn backtrace(&self) -> Vec<SourceLoc> {
        self.locs
            .iter()
            .rev()
            .skip(1)
            .map(RunLoc::to_source_loc)
            .collect()
    }

    #[inline]
    pub(crate) fn pws(&self) -> bool {
        self.pws
    }

    /// Turn preservation on (it is never turned off by a nested zone).
    /// Returns the previous setting for `pop_pws`.
    pub(crate) fn push_pws(&mut self, preserve: bool) -> bool {
        let old = self.pws;
        self.pws = old || preserve;
        old
    }

    pub(crate) fn pop_pws(&mut self, old: bool) {
        self.pws = old;
    }

    pub(crate) fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Returns the previous directory.
    pub(crate) fn set_cwd(&mut self, cwd: &str) -> String {
        std::mem::replace(&mut self.cwd, cwd.to_string())
    }
}

/// Resolve `name` against the directory `cwd`.
///
/// Absolute names are taken as-is; `.` and `..` segments are folded.
/// `..` never climbs above the root.
pub fn resolve_path(cwd: &str, name: &str) -> String {
    let joined = if name.starts_with('/') || cwd.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", cwd.trim_end_matches('/'))
    };

    let absolute = joined.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    let path = parts.join("/");
    if absolute {
        format!("/{path}")
    } else {
        path
    }
}
