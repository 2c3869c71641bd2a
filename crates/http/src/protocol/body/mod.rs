//! Response bodies.
//!
//! A body is a sequence of byte chunks produced on demand, optionally
//! closable. [`ResponseBody`] covers the common shapes (nothing, one chunk, a
//! list of chunks) and boxes any custom [`Body`] stream.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::protocol::error::BoxError;

/// A streaming response body.
pub trait Body: Send {
    /// Produces the next chunk, `None` once the body is exhausted.
    fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>>;

    /// Releases whatever the body holds. Called by the server once it is done
    /// with the body.
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Chunks(VecDeque<Bytes>),
    Stream(Box<dyn Body>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Once(Some(bytes)) }
    }

    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self { inner: Kind::Chunks(chunks.into_iter().map(Into::into).collect()) }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: Body + 'static,
    {
        Self { inner: Kind::Stream(Box::new(body)) }
    }

    /// Exact length when it is known without consuming the body.
    pub fn known_len(&self) -> Option<usize> {
        match &self.inner {
            Kind::Once(None) => Some(0),
            Kind::Once(Some(bytes)) => Some(bytes.len()),
            Kind::Chunks(chunks) => Some(chunks.iter().map(Bytes::len).sum()),
            Kind::Stream(_) => None,
        }
    }

    /// Drains the remaining chunks into one buffer. The body is not closed.
    pub fn collect_bytes(&mut self) -> Result<Bytes, BoxError> {
        let mut collected = Vec::new();
        for chunk in self.by_ref() {
            collected.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(collected))
    }
}

impl Body for ResponseBody {
    fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>> {
        match &mut self.inner {
            Kind::Once(option_bytes) => option_bytes.take().map(Ok),
            Kind::Chunks(chunks) => chunks.pop_front().map(Ok),
            Kind::Stream(body) => body.next_chunk(),
        }
    }

    fn close(&mut self) -> Result<(), BoxError> {
        match &mut self.inner {
            Kind::Stream(body) => body.close(),
            _ => Ok(()),
        }
    }
}

impl Iterator for ResponseBody {
    type Item = Result<Bytes, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(option_bytes) => f.debug_tuple("Once").field(option_bytes).finish(),
            Kind::Chunks(chunks) => f.debug_tuple("Chunks").field(chunks).finish(),
            Kind::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from(value)) }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Self::once(bytes),
            None => Self::empty(),
        }
    }
}

impl From<Vec<&'static str>> for ResponseBody {
    fn from(value: Vec<&'static str>) -> Self {
        Self::chunks(value.into_iter().map(|s| Bytes::from_static(s.as_bytes())))
    }
}

impl From<Vec<Bytes>> for ResponseBody {
    fn from(value: Vec<Bytes>) -> Self {
        Self::chunks(value)
    }
}
