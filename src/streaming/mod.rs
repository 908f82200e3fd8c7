//! Streaming primitives shared by the line framer and the pattern matcher
//!
//! This module provides:
//! - Two rolling byte buffers fed by every read (accumulator)
//! - Ordered multi-pattern substring search
//! - UTF-8 aware cut points for over-long lines

pub mod accumulator;
pub mod pattern;
pub mod utf8_boundary;

pub use accumulator::{Accumulator, Consumer, Overflow, Split, LINE_TERMINATOR};
pub use pattern::{Pattern, PatternMatch, PatternSet};
