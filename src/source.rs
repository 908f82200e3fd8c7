//! Byte Source
//!
//! The framer never talks to a device directly. It pulls bytes through
//! [`ByteSource::read`], a blocking call that must return within the given
//! timeout. A source that blocks forever stalls the framer; nothing on this
//! side can detect or recover from that.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::thread;
use std::time::Duration;

/// Outcome of a single source read
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intake {
    /// At least one byte arrived
    Data(Vec<u8>),
    /// The timeout elapsed with nothing to read; the stream is still open
    Idle,
    /// The stream ended and will not produce more bytes
    Closed,
}

impl Intake {
    pub fn is_closed(&self) -> bool {
        matches!(self, Intake::Closed)
    }

    /// Bytes carried by this intake (empty unless `Data`)
    pub fn bytes(&self) -> &[u8] {
        match self {
            Intake::Data(bytes) => bytes,
            _ => &[],
        }
    }
}

/// Blocking, timeout-bounded provider of raw bytes
pub trait ByteSource {
    /// Read at most `max_bytes`, blocking no longer than `timeout`.
    ///
    /// `Intake::Data` must never carry an empty vector; report `Idle` instead.
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> io::Result<Intake>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> io::Result<Intake> {
        (**self).read(max_bytes, timeout)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> io::Result<Intake> {
        (**self).read(max_bytes, timeout)
    }
}

/// Adapter for any blocking [`Read`] that already carries its own read
/// timeout (a serial port handle, a socket with `set_read_timeout`, ...).
///
/// The `timeout` argument is not forwarded: configure the reader with the
/// framer's poll interval before wrapping it.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, max_bytes: usize, _timeout: Duration) -> io::Result<Intake> {
        let mut buf = vec![0u8; max_bytes.max(1)];
        match self.inner.read(&mut buf) {
            Ok(0) => Ok(Intake::Closed),
            Ok(n) => {
                buf.truncate(n);
                Ok(Intake::Data(buf))
            }
            Err(e) => match e.kind() {
                io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::Interrupted => Ok(Intake::Idle),
                _ => Err(e),
            },
        }
    }
}

#[derive(Clone, Debug)]
enum Step {
    Data(Vec<u8>),
    Idle,
    Close,
}

/// Deterministic in-memory source replaying a fixed script.
///
/// Idle steps block for the requested timeout, like a quiet device would.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    /// Report `Closed` instead of `Idle` once the script runs out
    close_when_exhausted: bool,
    closed: bool,
    reads: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            close_when_exhausted: false,
            closed: false,
            reads: 0,
        }
    }

    /// Queue a burst of bytes; it is split across reads if larger than requested
    pub fn data(mut self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        if !bytes.is_empty() {
            self.steps.push_back(Step::Data(bytes.to_vec()));
        }
        self
    }

    /// Queue one quiet read
    pub fn idle(mut self) -> Self {
        self.steps.push_back(Step::Idle);
        self
    }

    pub fn idle_for(mut self, reads: usize) -> Self {
        for _ in 0..reads {
            self.steps.push_back(Step::Idle);
        }
        self
    }

    /// Queue end-of-stream
    pub fn close(mut self) -> Self {
        self.steps.push_back(Step::Close);
        self
    }

    /// Close the stream once the script runs out, instead of idling forever
    pub fn closing(mut self) -> Self {
        self.close_when_exhausted = true;
        self
    }

    /// Append bytes while the source is in use (e.g. through `Framer::source_mut`)
    pub fn push_data(&mut self, bytes: impl AsRef<[u8]>) {
        let bytes = bytes.as_ref();
        if !bytes.is_empty() {
            self.steps.push_back(Step::Data(bytes.to_vec()));
        }
    }

    /// Number of `read` calls served so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for ScriptedSource {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> io::Result<Intake> {
        self.reads += 1;

        if self.closed {
            return Ok(Intake::Closed);
        }

        match self.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let max_bytes = max_bytes.max(1);
                if bytes.len() > max_bytes {
                    let rest = bytes.split_off(max_bytes);
                    self.steps.push_front(Step::Data(rest));
                }
                Ok(Intake::Data(bytes))
            }
            Some(Step::Idle) => {
                thread::sleep(timeout);
                Ok(Intake::Idle)
            }
            Some(Step::Close) => {
                self.closed = true;
                Ok(Intake::Closed)
            }
            None if self.close_when_exhausted => {
                self.closed = true;
                Ok(Intake::Closed)
            }
            None => {
                thread::sleep(timeout);
                Ok(Intake::Idle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const T: Duration = Duration::from_millis(1);

    #[test]
    fn test_scripted_replays_in_order() {
        let mut source = ScriptedSource::new().data("abc").idle().data("d").close();

        assert_eq!(source.read(16, T).unwrap(), Intake::Data(b"abc".to_vec()));
        assert_eq!(source.read(16, T).unwrap(), Intake::Idle);
        assert_eq!(source.read(16, T).unwrap(), Intake::Data(b"d".to_vec()));
        assert_eq!(source.read(16, T).unwrap(), Intake::Closed);
        // Closed is sticky
        assert_eq!(source.read(16, T).unwrap(), Intake::Closed);
        assert_eq!(source.reads(), 5);
    }

    #[test]
    fn test_scripted_splits_large_bursts() {
        let mut source = ScriptedSource::new().data("abcdef");

        assert_eq!(source.read(4, T).unwrap(), Intake::Data(b"abcd".to_vec()));
        assert_eq!(source.read(4, T).unwrap(), Intake::Data(b"ef".to_vec()));
        assert_eq!(source.read(4, T).unwrap(), Intake::Idle);
    }

    #[test]
    fn test_scripted_exhaustion() {
        let mut idle = ScriptedSource::new();
        assert_eq!(idle.read(4, T).unwrap(), Intake::Idle);

        let mut closing = ScriptedSource::new().closing();
        assert_eq!(closing.read(4, T).unwrap(), Intake::Closed);
    }

    #[test]
    fn test_reader_source_maps_eof() {
        let mut source = ReaderSource::new(Cursor::new(b"hi".to_vec()));
        assert_eq!(source.read(8, T).unwrap(), Intake::Data(b"hi".to_vec()));
        assert_eq!(source.read(8, T).unwrap(), Intake::Closed);
    }

    struct TimingOut;

    impl Read for TimingOut {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "quiet"))
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn test_reader_source_maps_timeouts_to_idle() {
        let mut source = ReaderSource::new(TimingOut);
        assert_eq!(source.read(8, T).unwrap(), Intake::Idle);
    }

    #[test]
    fn test_reader_source_propagates_errors() {
        let mut source = ReaderSource::new(Broken);
        let err = source.read(8, T).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_intake_bytes() {
        assert_eq!(Intake::Data(b"x".to_vec()).bytes(), b"x");
        assert!(Intake::Idle.bytes().is_empty());
        assert!(Intake::Closed.is_closed());
    }
}
