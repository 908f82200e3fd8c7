//! Error types for the framer
//!
//! Timeouts are not errors. They surface as a partial line, an empty list,
//! or `WaitOutcome::TimedOut`. Only a failing byte source or bad
//! configuration ends up here.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum FramerError {
    #[error("Byte source failed: {0}")]
    Source(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, FramerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = FramerError::from(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err = FramerError::from(ConfigError::Invalid("line_chunk must be > 0".to_string()));
        assert_eq!(err.to_string(), "Invalid configuration: line_chunk must be > 0");
    }
}
