//! Line framing: `readline` and `readlines`

use std::borrow::Cow;
use std::fmt;
use std::str::Utf8Error;
use std::time::{Duration, Instant};

use log::trace;

use super::Framer;
use crate::error::Result;
use crate::source::ByteSource;
use crate::streaming::{Consumer, Split, LINE_TERMINATOR};
use crate::telemetry::{FramerEvent, FramerEventType};

/// Why a line ended where it did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEnd {
    /// Ends with the terminator
    Terminated,
    /// The timeout elapsed mid-line (or before any byte arrived)
    TimedOut,
    /// Cut at `max_line_len` (or `max_buffered`); the rest of the line is
    /// still buffered
    Truncated,
    /// The source reported end-of-stream
    Closed,
}

/// One framed line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
    end: LineEnd,
    skipped: usize,
}

impl Line {
    pub fn new(bytes: Vec<u8>, end: LineEnd) -> Self {
        Self {
            bytes,
            end,
            skipped: 0,
        }
    }

    pub fn end(&self) -> LineEnd {
        self.end
    }

    /// Unread bytes shed from the line buffer just before this line.
    ///
    /// Non-zero only after the buffer outgrew `max_buffered` while nobody
    /// was reading lines; shedding always stops at a line start.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_terminated(&self) -> bool {
        self.end == LineEnd::Terminated
    }

    /// True only when no byte arrived at all
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_str(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Line content without the trailing terminator
    pub fn trimmed(&self) -> &[u8] {
        self.bytes
            .strip_suffix(&[LINE_TERMINATOR])
            .unwrap_or(&self.bytes)
    }
}

impl AsRef<[u8]> for Line {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl PartialEq<&str> for Line {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl<S: ByteSource> Framer<S> {
    /// Read one line, waiting at most about `timeout`.
    ///
    /// A complete line already buffered is returned without reading. On
    /// timeout the whole partial line is returned with `LineEnd::TimedOut`
    /// (empty if nothing arrived) and the line buffer is left empty. At least
    /// one read is attempted, even with a zero timeout.
    ///
    /// A line longer than `max_line_len`, or than `max_buffered`, comes back
    /// in `LineEnd::Truncated` pieces; no byte of it is dropped.
    pub fn readline(&mut self, timeout: Duration) -> Result<Line> {
        let started = Instant::now();
        // None: too far out to represent, never expires
        let deadline = started.checked_add(timeout);
        let mut attempted = false;

        let end = loop {
            if let Some(split) = self.acc.split_line(self.config.max_line_len) {
                let mut line = self.finish_split(split, started);
                line.skipped = self.acc.take_skipped();
                return Ok(line);
            }
            if self.closed {
                break LineEnd::Closed;
            }
            if attempted && deadline.map_or(false, |d| Instant::now() >= d) {
                break LineEnd::TimedOut;
            }
            self.read_for(self.config.line_chunk, Consumer::Lines)?;
            attempted = true;
        };

        let mut line = Line::new(self.acc.take_line(), end);
        line.skipped = self.acc.take_skipped();
        if !line.is_empty() {
            self.stats.partial_lines += 1;
            self.emit_line_event(FramerEventType::LinePartial, &line, started);
        }
        trace!(
            "[framer={}] readline ended {:?} with {} bytes",
            self.config.label,
            end,
            line.len()
        );
        Ok(line)
    }

    fn finish_split(&mut self, split: Split, started: Instant) -> Line {
        let (line, event_type) = match split {
            Split::Line(bytes) => {
                self.stats.lines += 1;
                (Line::new(bytes, LineEnd::Terminated), FramerEventType::LineComplete)
            }
            Split::Cut(bytes) => {
                self.stats.truncated_lines += 1;
                (Line::new(bytes, LineEnd::Truncated), FramerEventType::LineTruncated)
            }
        };
        self.emit_line_event(event_type, &line, started);
        line
    }

    fn emit_line_event(&self, event_type: FramerEventType, line: &Line, started: Instant) {
        if self.config.log_events {
            FramerEvent::new(event_type, &self.config.label)
                .with_bytes(line.len())
                .with_elapsed_ms(started.elapsed().as_millis() as u64)
                .emit();
        }
    }

    /// Read lines until the stream goes quiet.
    ///
    /// Each line gets its own `timeout`. Stops after a line that timed out
    /// or hit end-of-stream (that line is included when non-empty). A
    /// burst of N complete lines followed by silence yields exactly N lines.
    pub fn readlines(&mut self, timeout: Duration) -> Result<Vec<Line>> {
        let mut lines = Vec::new();
        loop {
            let line = self.readline(timeout)?;
            if line.is_empty() {
                break;
            }
            let end = line.end();
            lines.push(line);
            if matches!(end, LineEnd::TimedOut | LineEnd::Closed) {
                break;
            }
        }
        Ok(lines)
    }

    /// `readline` with the configured line timeout
    pub fn readline_default(&mut self) -> Result<Line> {
        self.readline(self.config.line_timeout())
    }

    /// `readlines` with the configured line timeout
    pub fn readlines_default(&mut self) -> Result<Vec<Line>> {
        self.readlines(self.config.line_timeout())
    }
}
