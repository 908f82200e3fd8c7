//! Buffered, timeout-driven line and pattern framing
//!
//! Sits on top of a blocking byte source (typically a serial port with a
//! short read timeout) and turns its unpredictable bursts into:
//! - newline-terminated lines (`readline`, `readlines`)
//! - early exits on the first of several patterns (`wait_until`)
//!
//! Every call is bounded by a caller timeout. Timeouts are ordinary
//! results, never errors.
//!
//! ```
//! use std::time::Duration;
//! use serial_line_framer::{Framer, PatternSet, ScriptedSource};
//!
//! let source = ScriptedSource::new().data("boot ok\nlogin: ");
//! let mut framer = Framer::new(source, Duration::from_millis(10));
//!
//! let outcome = framer.wait_until(&PatternSet::new(["login:"]), Some(Duration::from_millis(100)))?;
//! assert_eq!(outcome.index(), Some(0));
//!
//! // The line buffer saw the same bytes
//! let line = framer.readline(Duration::from_millis(100))?;
//! assert_eq!(line, "boot ok\n");
//! # Ok::<(), serial_line_framer::FramerError>(())
//! ```

pub mod config;
pub mod error;
pub mod framer;
pub mod source;
pub mod streaming;
pub mod telemetry;

pub use config::{FramerConfig, MatchConsumption, MIN_POLL_INTERVAL};
pub use error::{FramerError, Result};
pub use framer::{Framer, FramerStats, Line, LineEnd, WaitOutcome};
pub use source::{ByteSource, Intake, ReaderSource, ScriptedSource};
pub use streaming::{Pattern, PatternMatch, PatternSet};
