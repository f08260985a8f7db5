//! walk::trace
//!
//! Diagnostics for dependency walks.
//!
//! Console messages go through [`crate::ui::output`] and honor the active
//! verbosity. A trace file, when configured, receives every line regardless
//! of verbosity, indented by library depth; it is flushed when the trace is
//! finished or dropped.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::ui::output::{self, Verbosity};

/// Logger threaded through walks, packs and commits.
#[derive(Debug)]
pub struct Trace {
    verbosity: Verbosity,
    sink: Option<BufWriter<File>>,
}

impl Trace {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: None,
        }
    }

    /// A trace that prints nothing and writes nowhere.
    pub fn silent() -> Self {
        Self::new(Verbosity::Quiet)
    }

    /// Also append every line to the file at `path` (truncated first).
    pub fn with_file(verbosity: Verbosity, path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            verbosity,
            sink: Some(BufWriter::new(file)),
        })
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// A line for the trace file only, indented by `level`.
    pub fn record(&mut self, level: usize, message: impl Display) {
        if let Some(sink) = self.sink.as_mut() {
            // Losing a trace line must not abort the operation being traced.
            let _ = writeln!(sink, "{:indent$}{}", "", message, indent = level * 2);
        }
    }

    pub fn info(&mut self, message: impl Display) {
        let line = message.to_string();
        self.record(0, &line);
        output::print(line, self.verbosity);
    }

    pub fn debug(&mut self, level: usize, message: impl Display) {
        let line = message.to_string();
        self.record(level, &line);
        output::debug(line, self.verbosity);
    }

    pub fn warn(&mut self, message: impl Display) {
        let line = message.to_string();
        self.record(0, format_args!("warning: {}", line));
        output::warn(line, self.verbosity);
    }

    /// Flush the trace file.
    pub fn finish(mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(mut sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for Trace {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.flush();
        }
    }
}
