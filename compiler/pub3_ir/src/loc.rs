//! Source locations attached to diagnostics and error values.

use std::fmt;
use std::sync::Arc;

/// A 1-based line number in a template file (0 = unknown).
pub type Line = u32;

/// Where something happened: file, enclosing function (if any), line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub file: Arc<str>,
    pub func: Option<Arc<str>>,
    pub line: Line,
}

impl SourceLoc {
    pub fn new(file: impl Into<Arc<str>>, line: Line) -> Self {
        SourceLoc {
            file: file.into(),
            func: None,
            line,
        }
    }

    #[must_use]
    pub fn with_func(mut self, func: impl Into<Arc<str>>) -> Self {
        self.func = Some(func.into());
        self
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if let Some(func) = &self.func {
            write!(f, " (in {func})")?;
        }
        Ok(())
    }
}
