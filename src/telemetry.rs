//! Telemetry for the framer
//!
//! Framing milestones are emitted as structured JSON log lines through the
//! `log` facade, so any logger the host installs can collect them.

use log::{debug, warn};
use serde::Serialize;

/// Framer event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FramerEventType {
    /// A terminated line was returned
    LineComplete,
    /// `readline` timed out and returned what it had
    LinePartial,
    /// A line hit `max_line_len` and was cut
    LineTruncated,
    /// `wait_until` matched a pattern
    PatternMatched,
    /// `wait_until` gave up
    WaitTimedOut,
    /// The byte source reported end-of-stream
    StreamClosed,
    /// The match buffer hit its cap and dropped old bytes
    BufferOverflow,
}

/// Structured framer event
#[derive(Debug, Clone, Serialize)]
pub struct FramerEvent {
    pub event_type: FramerEventType,
    /// Framer label (port name)
    pub label: String,
    /// Bytes involved (line length, dropped bytes, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Index of the matched pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_index: Option<usize>,
    /// Pattern matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    /// Milliseconds spent in the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FramerEvent {
    pub fn new(event_type: FramerEventType, label: &str) -> Self {
        Self {
            event_type,
            label: label.to_string(),
            bytes: None,
            pattern_index: None,
            matched_pattern: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn with_pattern(mut self, index: usize, pattern: &str) -> Self {
        self.pattern_index = Some(index);
        self.matched_pattern = Some(pattern.to_string());
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    /// Log the event
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => match self.event_type {
                FramerEventType::BufferOverflow | FramerEventType::StreamClosed => {
                    warn!("[FRAMER-EVENT] {}", json);
                }
                _ => {
                    debug!("[FRAMER-EVENT] {}", json);
                }
            },
            Err(e) => {
                warn!("Failed to serialize framer event: {}", e);
            }
        }
    }
}

/// Create a match buffer overflow event
pub fn event_overflow(label: &str, dropped: usize) -> FramerEvent {
    FramerEvent::new(FramerEventType::BufferOverflow, label)
        .with_bytes(dropped)
        .with_reason("match buffer full, oldest bytes dropped")
}

/// Create a pattern matched event
pub fn event_matched(label: &str, index: usize, pattern: &str, elapsed_ms: u64) -> FramerEvent {
    FramerEvent::new(FramerEventType::PatternMatched, label)
        .with_pattern(index, pattern)
        .with_elapsed_ms(elapsed_ms)
}

/// Create a stream closed event
pub fn event_closed(label: &str, pending: usize) -> FramerEvent {
    FramerEvent::new(FramerEventType::StreamClosed, label).with_bytes(pending)
}
