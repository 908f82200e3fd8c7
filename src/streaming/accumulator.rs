//! Rolling byte accumulator
//!
//! Every byte read from the source lands in two buffers:
//! - the match buffer, searched by `wait_until` and trimmed at line
//!   boundaries when nothing matches
//! - the line buffer, consumed one line at a time by `readline`
//!
//! Both survive across calls, so trailing bytes from one call seed the next.
//!
//! The match buffer is capped at a fixed size; past it the oldest bytes are
//! dropped. The line buffer never loses bytes from the middle of a line:
//! - while lines are being read, a line longer than the cap is handed out
//!   in cap-sized cuts
//! - otherwise whole lines are shed from the front, and if a single
//!   unterminated line outgrows the cap it is discarded along with the rest
//!   of that line, so line framing resumes at the next line start
//!
//! Shed bytes are counted and reported with the next line.

use super::pattern::{PatternMatch, PatternSet};
use super::utf8_boundary::safe_split_point;

/// The only framing unit: a single newline byte
pub const LINE_TERMINATOR: u8 = b'\n';

/// A line cut off the front of the line buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Split {
    /// Bytes through and including the terminator
    Line(Vec<u8>),
    /// At most `max_line_len` (or the buffer cap) bytes, cut at a character
    /// boundary where possible, no terminator
    Cut(Vec<u8>),
}

/// Which operation a read is made for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consumer {
    /// `readline`: nothing is shed from the line buffer
    Lines,
    /// `wait_until` and plain intakes: the line buffer is kept under the cap
    Patterns,
}

/// Bytes dropped from each buffer by one `record` call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overflow {
    /// Whole lines (or the rest of an over-long line) shed from the line buffer
    pub line: usize,
    /// Oldest bytes dropped from the match buffer
    pub matched: usize,
}

impl Overflow {
    pub fn is_empty(&self) -> bool {
        self.line == 0 && self.matched == 0
    }
}

pub struct Accumulator {
    match_buf: Vec<u8>,
    line_buf: Vec<u8>,
    /// Per-buffer cap
    capacity: usize,
    /// Dropping input until the next terminator
    resyncing: bool,
    /// Line bytes shed since the last `take_skipped`
    skipped: usize,
}

impl Accumulator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            match_buf: Vec::new(),
            line_buf: Vec::new(),
            capacity,
            resyncing: false,
            skipped: 0,
        }
    }

    /// Append one intake to both buffers
    pub fn record(&mut self, bytes: &[u8], consumer: Consumer) -> Overflow {
        self.match_buf.extend_from_slice(bytes);
        let excess = self.match_buf.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.match_buf.drain(..excess);
        }

        let before = self.skipped;
        let bytes = self.skip_to_line_start(bytes);
        self.line_buf.extend_from_slice(bytes);
        if consumer == Consumer::Patterns {
            self.shed_lines();
        }

        Overflow {
            line: self.skipped - before,
            matched: excess,
        }
    }

    fn skip_to_line_start<'a>(&mut self, bytes: &'a [u8]) -> &'a [u8] {
        if !self.resyncing {
            return bytes;
        }
        match bytes.iter().position(|&b| b == LINE_TERMINATOR) {
            Some(pos) => {
                self.resyncing = false;
                self.skipped += pos + 1;
                &bytes[pos + 1..]
            }
            None => {
                self.skipped += bytes.len();
                &[]
            }
        }
    }

    /// Drop whole lines from the front until the line buffer fits the cap
    fn shed_lines(&mut self) {
        let excess = self.line_buf.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        // First terminator that leaves at most `capacity` bytes behind it
        let boundary = self.line_buf[excess - 1..]
            .iter()
            .position(|&b| b == LINE_TERMINATOR)
            .map(|pos| excess + pos);

        match boundary {
            Some(end) => {
                self.line_buf.drain(..end);
                self.skipped += end;
            }
            None => {
                self.skipped += self.line_buf.len();
                self.line_buf.clear();
                self.resyncing = true;
            }
        }
    }

    /// Next line from the line buffer, if one is ready.
    ///
    /// A line longer than `max_len`, or than the buffer cap, comes back as a
    /// `Cut` of at most that many bytes; the rest stays buffered.
    pub fn split_line(&mut self, max_len: Option<usize>) -> Option<Split> {
        let limit = max_len.map_or(self.capacity, |len| len.min(self.capacity));
        let newline = self.line_buf.iter().position(|&b| b == LINE_TERMINATOR);

        match newline {
            Some(pos) if pos + 1 > limit => Some(self.cut(limit)),
            Some(pos) => Some(Split::Line(self.line_buf.drain(..=pos).collect())),
            None if self.line_buf.len() >= limit => Some(self.cut(limit)),
            None => None,
        }
    }

    fn cut(&mut self, limit: usize) -> Split {
        let at = safe_split_point(&self.line_buf, limit.max(1));
        Split::Cut(self.line_buf.drain(..at).collect())
    }

    /// Drain the whole line buffer (a partial line, possibly empty)
    pub fn take_line(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.line_buf)
    }

    /// Line bytes shed since the last call
    pub fn take_skipped(&mut self) -> usize {
        std::mem::take(&mut self.skipped)
    }

    /// Search the match buffer
    pub fn find_match(&self, patterns: &PatternSet, case_insensitive: bool) -> Option<PatternMatch> {
        patterns.find_with(&self.match_buf, case_insensitive)
    }

    /// Drop the front of the match buffer up to (not including) `through`
    pub fn consume_match(&mut self, through: usize) {
        let through = through.min(self.match_buf.len());
        self.match_buf.drain(..through);
    }

    /// Drop everything up to and including the last terminator.
    ///
    /// Returns the number of bytes dropped. Trailing bytes after the last
    /// terminator are kept, so a pattern split across reads can still match.
    pub fn trim_to_last_terminator(&mut self) -> usize {
        match self.match_buf.iter().rposition(|&b| b == LINE_TERMINATOR) {
            Some(pos) => {
                self.match_buf.drain(..=pos);
                pos + 1
            }
            None => 0,
        }
    }

    pub fn pending_line(&self) -> &[u8] {
        &self.line_buf
    }

    pub fn pending_match(&self) -> &[u8] {
        &self.match_buf
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset the buffer state
    pub fn clear(&mut self) {
        self.match_buf.clear();
        self.line_buf.clear();
        self.resyncing = false;
        self.skipped = 0;
    }
}
