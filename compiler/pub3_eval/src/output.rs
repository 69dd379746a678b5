//! Output sinks for published text.
//!
//! A publish only ever appends: literal text, the string form of evaluated
//! expressions, and rendered errors. The sink decides where it goes:
//! - `Stdout`: straight to standard output
//! - `Buffer`: captured in memory (hosts that post-process, tests)
//! - `Discard`: dropped (`run_cfg`, syntax checks)
//!
//! Enum dispatch keeps the hot `write_str` path free of vtable calls.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Writes to standard output.
#[derive(Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn write_str(&self, s: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not the publish's problem.
        let _ = out.write_all(s.as_bytes());
    }
}

/// Captures output in memory.
#[derive(Default)]
pub struct BufferSink {
    buffer: Mutex<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_str(&self, s: &str) {
        self.buffer.lock().push_str(s);
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Take the captured output, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Destination of a publish.
pub enum OutputSink {
    Stdout(StdoutSink),
    Buffer(BufferSink),
    Discard,
}

impl OutputSink {
    #[inline]
    pub fn write_str(&self, s: &str) {
        if s.is_empty() {
            return;
        }
        match self {
            Self::Stdout(sink) => sink.write_str(s),
            Self::Buffer(sink) => sink.write_str(s),
            Self::Discard => {}
        }
    }

    /// Captured output; empty for sinks that don't capture.
    pub fn contents(&self) -> String {
        match self {
            Self::Buffer(sink) => sink.contents(),
            Self::Stdout(_) | Self::Discard => String::new(),
        }
    }
}

/// Sink shared between a host and the publishes writing into it.
pub type SharedSink = Arc<OutputSink>;

pub fn stdout_sink() -> SharedSink {
    Arc::new(OutputSink::Stdout(StdoutSink))
}

pub fn buffer_sink() -> SharedSink {
    Arc::new(OutputSink::Buffer(BufferSink::new()))
}

pub fn discard_sink() -> SharedSink {
    Arc::new(OutputSink::Discard)
}

#[cfg(test)]
mod tests;
