//! Pattern waits: `wait_until`

use std::time::{Duration, Instant};

use log::{debug, trace};

use super::Framer;
use crate::config::MatchConsumption;
use crate::error::Result;
use crate::source::ByteSource;
use crate::streaming::{PatternMatch, PatternSet};
use crate::telemetry::{event_matched, FramerEvent, FramerEventType};

/// Result of a `wait_until` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Matched(PatternMatch),
    /// The timeout elapsed with no pattern seen
    TimedOut,
    /// The source ended with no pattern seen
    Closed,
}

impl WaitOutcome {
    /// Index of the matched pattern
    pub fn index(&self) -> Option<usize> {
        match self {
            WaitOutcome::Matched(m) => Some(m.pattern_index),
            _ => None,
        }
    }

    /// Pattern index, or -1 when nothing matched
    pub fn code(&self) -> i64 {
        self.index().map_or(-1, |i| i as i64)
    }

    pub fn is_match(&self) -> bool {
        matches!(self, WaitOutcome::Matched(_))
    }
}

/// Timeout in (possibly fractional) seconds; zero or negative waits forever
pub fn timeout_from_secs(secs: f64) -> Option<Duration> {
    if secs > 0.0 && secs.is_finite() {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

impl<S: ByteSource> Framer<S> {
    /// Wait until one of `patterns` shows up in the stream.
    ///
    /// Patterns are tried in order against everything buffered so far; the
    /// first one found wins. Case is folded if either the set or the config
    /// asks for it. On a miss the match buffer is trimmed through
    /// its last terminator and one more chunk is read (one poll interval).
    /// `None` waits forever. At least one read happens before a timeout.
    pub fn wait_until(
        &mut self,
        patterns: &PatternSet,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome> {
        let started = Instant::now();
        let deadline = timeout.and_then(|t| started.checked_add(t));
        let case_insensitive = self.config.case_insensitive;
        let mut attempted = false;

        loop {
            if let Some(m) = self.acc.find_match(patterns, case_insensitive) {
                return Ok(self.finish_match(m, started));
            }

            let trimmed = self.acc.trim_to_last_terminator();
            if trimmed > 0 {
                trace!("[framer={}] Trimmed {} stale bytes", self.config.label, trimmed);
            }

            if self.closed {
                debug!(
                    "[framer={}] Source closed while waiting for {} patterns",
                    self.config.label,
                    patterns.len()
                );
                return Ok(WaitOutcome::Closed);
            }
            if attempted && deadline.map_or(false, |d| Instant::now() >= d) {
                return Ok(self.finish_timeout(started));
            }

            self.intake(self.config.match_chunk)?;
            attempted = true;
        }
    }

    fn finish_match(&mut self, m: PatternMatch, started: Instant) -> WaitOutcome {
        let through = match self.config.match_consumption {
            MatchConsumption::ThroughMatch => m.end,
            MatchConsumption::FirstByte => m.start + 1,
        };
        self.acc.consume_match(through);
        self.stats.matches += 1;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            "[framer={}] Matched pattern {} ('{}') after {}ms",
            self.config.label, m.pattern_index, m.pattern_name, elapsed_ms
        );
        if self.config.log_events {
            event_matched(&self.config.label, m.pattern_index, &m.pattern_name, elapsed_ms).emit();
        }
        WaitOutcome::Matched(m)
    }

    fn finish_timeout(&mut self, started: Instant) -> WaitOutcome {
        self.stats.wait_timeouts += 1;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!("[framer={}] No pattern after {}ms", self.config.label, elapsed_ms);
        if self.config.log_events {
            FramerEvent::new(FramerEventType::WaitTimedOut, &self.config.label)
                .with_bytes(self.acc.pending_match().len())
                .with_elapsed_ms(elapsed_ms)
                .emit();
        }
        WaitOutcome::TimedOut
    }

    /// `wait_until` with the timeout given in seconds, zero or negative
    /// meaning forever
    pub fn wait_until_secs(&mut self, patterns: &PatternSet, secs: f64) -> Result<WaitOutcome> {
        self.wait_until(patterns, timeout_from_secs(secs))
    }

    /// `wait_until` with the configured wait timeout
    pub fn wait_until_default(&mut self, patterns: &PatternSet) -> Result<WaitOutcome> {
        self.wait_until(patterns, self.config.wait_timeout())
    }
}
