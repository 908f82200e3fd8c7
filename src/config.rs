//! Configuration module for the line framer
//!
//! Configuration is plain data: build it in code or parse it from JSON
//! (e.g. a device profile). Nothing here touches the byte source.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Lowest poll interval the framer will run with.
///
/// Requests below this (including zero) are clamped to it, so every poll
/// loop makes forward progress without spinning.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What `wait_until` drops from the match buffer after a successful match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConsumption {
    /// Drop everything through the end of the match
    #[default]
    ThroughMatch,
    /// Drop everything through the first byte of the match only, so an
    /// occurrence starting one byte later is still visible to the next wait
    FirstByte,
}

/// Framer configuration
#[derive(Clone, Debug, Deserialize)]
pub struct FramerConfig {
    /// Name used in log lines and events (usually the port name)
    #[serde(default = "default_label")]
    pub label: String,

    /// Per-read timeout handed to the byte source, and the granularity of
    /// every poll loop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Default timeout for `readline` / `readlines` callers that do not pick one
    #[serde(default = "default_line_timeout_ms")]
    pub line_timeout_ms: u64,

    /// Default timeout for `wait_until`; 0 waits forever
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Bytes requested per read while framing lines
    #[serde(default = "default_line_chunk")]
    pub line_chunk: usize,

    /// Bytes requested per read while waiting for a pattern
    #[serde(default = "default_match_chunk")]
    pub match_chunk: usize,

    /// Longest line `readline` returns before cutting it (None = up to
    /// `max_buffered`)
    #[serde(default)]
    pub max_line_len: Option<usize>,

    /// Cap on each rolling buffer. The match buffer drops its oldest bytes
    /// past it; the line buffer cuts or sheds whole lines instead
    #[serde(default = "default_max_buffered")]
    pub max_buffered: usize,

    #[serde(default)]
    pub match_consumption: MatchConsumption,

    /// ASCII case-insensitive pattern matching
    #[serde(default)]
    pub case_insensitive: bool,

    /// Whether to emit structured framer events (for debugging)
    #[serde(default = "default_log_events")]
    pub log_events: bool,
}

fn default_label() -> String {
    "serial".to_string()
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_line_timeout_ms() -> u64 {
    1_000
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_line_chunk() -> usize {
    512
}

fn default_match_chunk() -> usize {
    128
}

fn default_max_buffered() -> usize {
    64 * 1024 // 64KB
}

fn default_log_events() -> bool {
    true
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            poll_interval_ms: default_poll_interval_ms(),
            line_timeout_ms: default_line_timeout_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
            line_chunk: default_line_chunk(),
            match_chunk: default_match_chunk(),
            max_line_len: None,
            max_buffered: default_max_buffered(),
            match_consumption: MatchConsumption::default(),
            case_insensitive: false,
            log_events: default_log_events(),
        }
    }
}

impl FramerConfig {
    /// Parse and validate configuration from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config_str =
            std::str::from_utf8(bytes).map_err(|e| ConfigError::InvalidUtf8(e.to_string()))?;

        let config: Self = serde_json::from_str(config_str)
            .map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style poll interval override
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Reject values that would stall the poll loops
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_chunk == 0 {
            return Err(ConfigError::Invalid("line_chunk must be > 0".to_string()));
        }
        if self.match_chunk == 0 {
            return Err(ConfigError::Invalid("match_chunk must be > 0".to_string()));
        }
        if self.max_buffered == 0 {
            return Err(ConfigError::Invalid("max_buffered must be > 0".to_string()));
        }
        if self.max_line_len == Some(0) {
            return Err(ConfigError::Invalid("max_line_len must be > 0".to_string()));
        }
        Ok(())
    }

    /// Poll interval, clamped to [`MIN_POLL_INTERVAL`]
    pub fn poll_interval(&self) -> Duration {
        clamp_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    pub fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    /// `None` means wait forever
    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Clamp a requested poll interval to the floor
pub fn clamp_poll_interval(requested: Duration) -> Duration {
    requested.max(MIN_POLL_INTERVAL)
}

/// Configuration parsing errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(String),
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FramerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.line_chunk, 512);
        assert!(config.max_line_len.is_none());
        assert_eq!(config.match_consumption, MatchConsumption::ThroughMatch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{"label": "ttyUSB0", "poll_interval_ms": 25, "match_consumption": "first_byte"}"#;
        let config = FramerConfig::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(config.label, "ttyUSB0");
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert_eq!(config.match_consumption, MatchConsumption::FirstByte);
        assert_eq!(config.match_chunk, 128);
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = FramerConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), MIN_POLL_INTERVAL);

        let config = FramerConfig::default().with_poll_interval(Duration::from_micros(500));
        assert_eq!(config.poll_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_wait_timeout_zero_is_forever() {
        let config = FramerConfig {
            wait_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.wait_timeout(), None);
    }

    #[test]
    fn test_rejects_zero_chunk() {
        let json = r#"{"line_chunk": 0}"#;
        let err = FramerConfig::from_bytes(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_json() {
        let err = FramerConfig::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));

        let err = FramerConfig::from_bytes(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUtf8(_)));
    }
}
