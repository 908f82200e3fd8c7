//! Buffered, timeout-driven framer
//!
//! A [`Framer`] owns a [`ByteSource`] and turns its arbitrarily chunked
//! output into newline-terminated lines (`readline`, `readlines`) or early
//! exits on caller-supplied patterns (`wait_until`). All calls block the
//! caller for at most their timeout plus one poll interval.
//!
//! A framer is meant for one caller at a time; both rolling buffers are
//! shared between the three operations on purpose, so a `readline` after a
//! `wait_until` (or the other way round) sees every byte that was read.

mod line;
mod wait;

pub use line::{Line, LineEnd};
pub use wait::{timeout_from_secs, WaitOutcome};

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serde::Serialize;

use crate::config::{clamp_poll_interval, FramerConfig};
use crate::error::Result;
use crate::source::{ByteSource, Intake};
use crate::streaming::{Accumulator, Consumer, Overflow};
use crate::telemetry::{event_closed, event_overflow};

/// Running counters for one framer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FramerStats {
    /// Source reads issued
    pub reads: u64,
    /// Reads that came back with nothing
    pub idle_reads: u64,
    pub bytes_read: u64,
    /// Terminated lines returned
    pub lines: u64,
    /// Non-empty lines returned without a terminator (timeout or close)
    pub partial_lines: u64,
    pub truncated_lines: u64,
    pub matches: u64,
    pub wait_timeouts: u64,
    /// Bytes dropped from the match buffer on overflow
    pub overflowed_bytes: u64,
    /// Unread line bytes shed at line boundaries to stay under the cap
    pub skipped_line_bytes: u64,
}

/// Line and pattern framer over a blocking byte source
pub struct Framer<S> {
    source: S,
    acc: Accumulator,
    config: FramerConfig,
    poll_interval: Duration,
    /// Sticky once the source reports end-of-stream
    closed: bool,
    stats: FramerStats,
}

impl<S: ByteSource> Framer<S> {
    /// Create a framer with default settings and the given poll interval.
    ///
    /// Intervals below [`MIN_POLL_INTERVAL`](crate::config::MIN_POLL_INTERVAL)
    /// are clamped to it.
    pub fn new(source: S, poll_interval: Duration) -> Self {
        let config = FramerConfig::default().with_poll_interval(poll_interval);
        Self::build(source, config)
    }

    /// Create a framer from a full configuration
    pub fn with_config(source: S, config: FramerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(source, config))
    }

    fn build(source: S, config: FramerConfig) -> Self {
        let requested = Duration::from_millis(config.poll_interval_ms);
        let poll_interval = clamp_poll_interval(requested);
        if poll_interval != requested {
            debug!(
                "[framer={}] Poll interval {:?} below floor, using {:?}",
                config.label, requested, poll_interval
            );
        }

        Self {
            source,
            acc: Accumulator::new(config.max_buffered),
            poll_interval,
            closed: false,
            stats: FramerStats::default(),
            config,
        }
    }

    /// One read of at most `max_bytes` from the source.
    ///
    /// The poll interval is the per-read timeout. Whatever arrives is
    /// recorded in both the line and match buffers before being returned.
    /// A source that comes back idle early is paced out to a full poll
    /// interval so callers looping on this never spin.
    ///
    /// Unread lines past `max_buffered` are shed whole from the front of the
    /// line buffer; the next line returned reports them in
    /// [`Line::skipped`].
    pub fn intake(&mut self, max_bytes: usize) -> Result<Intake> {
        self.read_for(max_bytes, Consumer::Patterns)
    }

    fn read_for(&mut self, max_bytes: usize, consumer: Consumer) -> Result<Intake> {
        if self.closed {
            return Ok(Intake::Closed);
        }

        let started = Instant::now();
        let intake = match self.source.read(max_bytes.max(1), self.poll_interval)? {
            Intake::Data(bytes) if bytes.is_empty() => Intake::Idle,
            other => other,
        };
        self.stats.reads += 1;

        match &intake {
            Intake::Data(bytes) => {
                self.stats.bytes_read += bytes.len() as u64;
                trace!("[framer={}] Read {} bytes", self.config.label, bytes.len());
                let overflow = self.acc.record(bytes, consumer);
                if !overflow.is_empty() {
                    self.report_overflow(overflow);
                }
            }
            Intake::Idle => {
                self.stats.idle_reads += 1;
                let spent = started.elapsed();
                if spent < self.poll_interval {
                    thread::sleep(self.poll_interval - spent);
                }
            }
            Intake::Closed => {
                self.closed = true;
                debug!(
                    "[framer={}] Source closed, {} bytes still buffered",
                    self.config.label,
                    self.acc.pending_line().len()
                );
                if self.config.log_events {
                    event_closed(&self.config.label, self.acc.pending_line().len()).emit();
                }
            }
        }

        Ok(intake)
    }

    fn report_overflow(&mut self, overflow: Overflow) {
        if overflow.line > 0 {
            // Routine when only wait_until is reading
            self.stats.skipped_line_bytes += overflow.line as u64;
            debug!(
                "[framer={}] Shed {} unread line bytes",
                self.config.label, overflow.line
            );
        }
        if overflow.matched > 0 {
            self.stats.overflowed_bytes += overflow.matched as u64;
            warn!(
                "[framer={}] Match buffer cap ({} bytes) reached, dropped {} bytes",
                self.config.label,
                self.acc.capacity(),
                overflow.matched
            );
            if self.config.log_events {
                event_overflow(&self.config.label, overflow.matched).emit();
            }
        }
    }

    /// Discard everything buffered. End-of-stream, once seen, is kept.
    pub fn reset(&mut self) {
        debug!("[framer={}] Resetting buffers", self.config.label);
        self.acc.clear();
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    pub fn stats(&self) -> &FramerStats {
        &self.stats
    }

    /// Whether the source has reported end-of-stream
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes waiting to be framed into lines
    pub fn pending_line(&self) -> &[u8] {
        self.acc.pending_line()
    }

    /// Bytes still visible to the next `wait_until`
    pub fn pending_match(&self) -> &[u8] {
        self.acc.pending_match()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source (e.g. to write a command to the port)
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
