//! Stream capabilities carried by the environment.
//!
//! The input stream is the request body as the server received it; the error
//! stream is where applications report problems. Both are owned by the server
//! boundary: middleware reads and writes them but never closes them.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use tracing::{debug, error, info, warn};

use crate::protocol::error::{BoxError, StreamError};

/// The request body, readable in binary.
///
/// `read(None)` returns the whole remainder and never `None`; at the end of
/// data it returns empty bytes. `read(Some(n))` returns at most `n` bytes, or
/// `None` once the data is exhausted, except that `read(Some(0))` always
/// returns empty bytes. When a buffer is given its previous content is
/// replaced by the data read.
pub trait InputStream: Send {
    /// Reads the next line, including its trailing `\n`.
    fn gets(&mut self) -> Result<Option<Bytes>, BoxError>;

    fn read(&mut self, length: Option<usize>, buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError>;

    /// Yields the remaining data line by line.
    fn each(&mut self, f: &mut dyn FnMut(Bytes)) -> Result<(), BoxError>;

    fn rewind(&mut self) -> Result<(), BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;
}

/// Where applications write diagnostics.
pub trait ErrorStream: Send {
    /// Writes `message` followed by a newline.
    fn puts(&mut self, message: &str) -> Result<(), BoxError>;

    fn write(&mut self, data: &[u8]) -> Result<usize, BoxError>;

    fn flush(&mut self) -> Result<(), BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;
}

/// A leveled logger offered to applications.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn fatal(&self, message: &str);
}

/// An in-memory input stream.
#[derive(Debug, Clone, Default)]
pub struct StringInput {
    data: Bytes,
    pos: usize,
    closed: bool,
}

impl StringInput {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), pos: 0, closed: false }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Bytes {
        let end = self.pos + n.min(self.remaining());
        let bytes = self.data.slice(self.pos..end);
        self.pos = end;
        bytes
    }
}

fn fill(buffer: Option<&mut BytesMut>, bytes: &Bytes) {
    if let Some(buffer) = buffer {
        buffer.clear();
        buffer.extend_from_slice(bytes);
    }
}

impl InputStream for StringInput {
    fn gets(&mut self) -> Result<Option<Bytes>, BoxError> {
        self.ensure_open()?;
        if self.remaining() == 0 {
            return Ok(None);
        }

        let rest = &self.data[self.pos..];
        let line_len = rest.iter().position(|b| *b == b'\n').map_or(rest.len(), |i| i + 1);
        Ok(Some(self.take(line_len)))
    }

    fn read(&mut self, length: Option<usize>, buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError> {
        self.ensure_open()?;
        let bytes = match length {
            None => self.take(self.remaining()),
            Some(0) => Bytes::new(),
            Some(_) if self.remaining() == 0 => {
                fill(buffer, &Bytes::new());
                return Ok(None);
            }
            Some(n) => self.take(n),
        };

        fill(buffer, &bytes);
        Ok(Some(bytes))
    }

    fn each(&mut self, f: &mut dyn FnMut(Bytes)) -> Result<(), BoxError> {
        while let Some(line) = self.gets()? {
            f(line);
        }
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), BoxError> {
        self.ensure_open()?;
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        Ok(())
    }
}

/// An input stream without data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInput;

impl InputStream for NullInput {
    fn gets(&mut self) -> Result<Option<Bytes>, BoxError> {
        Ok(None)
    }

    fn read(&mut self, length: Option<usize>, buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError> {
        fill(buffer, &Bytes::new());
        match length {
            None | Some(0) => Ok(Some(Bytes::new())),
            Some(_) => Ok(None),
        }
    }

    fn each(&mut self, _f: &mut dyn FnMut(Bytes)) -> Result<(), BoxError> {
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An error stream collecting everything written into a shared buffer.
///
/// Clones share the buffer, so a test can keep one handle and install another
/// in the environment.
#[derive(Debug, Clone, Default)]
pub struct ErrorBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&guard).into_owned()
    }
}

impl ErrorStream for ErrorBuffer {
    fn puts(&mut self, message: &str) -> Result<(), BoxError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.extend_from_slice(message.as_bytes());
        if !message.ends_with('\n') {
            guard.push(b'\n');
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BoxError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An error stream that reports every complete line as a `warn` event.
#[derive(Debug, Default)]
pub struct TracingErrors {
    pending: Vec<u8>,
}

impl TracingErrors {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_lines(&mut self) {
        while let Some(i) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=i).collect();
            let line = String::from_utf8_lossy(&line[..i]);
            warn!(target: "lack::errors", "{}", line);
        }
    }
}

impl ErrorStream for TracingErrors {
    fn puts(&mut self, message: &str) -> Result<(), BoxError> {
        self.pending.extend_from_slice(message.as_bytes());
        if !message.ends_with('\n') {
            self.pending.push(b'\n');
        }
        self.emit_lines();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BoxError> {
        self.pending.extend_from_slice(data);
        self.emit_lines();
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), BoxError> {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            warn!(target: "lack::errors", "{}", line);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.flush()
    }
}

/// A [`Logger`] forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "lack::app", "{}", message);
    }

    fn debug(&self, message: &str) {
        debug!(target: "lack::app", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "lack::app", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "lack::app", "{}", message);
    }

    fn fatal(&self, message: &str) {
        error!(target: "lack::app", fatal = true, "{}", message);
    }
}

impl fmt::Debug for dyn InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InputStream")
    }
}

impl fmt::Debug for dyn ErrorStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorStream")
    }
}
