//! Hot path: guard, expand, reassemble, normalize, parse, dispatch.
//!
//! Runs synchronously on whichever task emitted the log call. Nothing here
//! takes a lock; per-task state lives in [`crate::context`].

use crate::context::{self, ReentrancyGuard};
use crate::format::{self, FormatError};
use crate::normalize::normalize;
use crate::parser::Parser;
use crate::sink::Sink;

/// One configured pass from raw output to the sink.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    sink: &'a dyn Sink,
    parser: Parser,
    max_line_len: Option<usize>,
}

impl<'a> Pipeline<'a> {
    pub fn new(sink: &'a dyn Sink, parser: Parser) -> Self {
        Self {
            sink,
            parser,
            max_line_len: None,
        }
    }

    /// Force-flush lines reaching `limit` bytes without a terminator.
    pub fn with_line_limit(mut self, limit: Option<usize>) -> Self {
        self.max_line_len = limit;
        self
    }

    /// Handle one hook invocation.
    ///
    /// `write` expands the caller's format arguments (see
    /// [`format::expand`]); it is not called when the invocation is a nested
    /// one on the same task. Returns the number of characters processed, 0
    /// when the call was suppressed, or the writer's negative code when
    /// formatting failed.
    pub fn on_output<W>(&self, write: W) -> i32
    where
        W: FnMut(&mut [u8]) -> i32,
    {
        let Some(_guard) = ReentrancyGuard::enter() else {
            return 0;
        };

        match format::expand(write, |bytes| {
            self.ingest(bytes);
            bytes.len()
        }) {
            Ok(len) => i32::try_from(len).unwrap_or(i32::MAX),
            Err(FormatError::Failed(code)) => code,
        }
    }

    /// Append a raw fragment for the calling task; dispatch if a line completed.
    pub fn ingest(&self, fragment: &[u8]) {
        if let Some(line) = context::feed(fragment, self.max_line_len) {
            self.complete(&line);
        }
    }

    /// Normalize, parse and dispatch one completed line. Empty lines are skipped.
    pub fn complete(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let line = normalize(&text);
        if line.is_empty() {
            return;
        }
        self.sink.dispatch(self.parser.parse(&line));
    }
}
