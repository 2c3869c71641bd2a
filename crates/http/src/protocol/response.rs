//! The response triple: status, headers and body.

use std::fmt;

use http::StatusCode;

use crate::protocol::body::ResponseBody;

/// Response headers.
///
/// Names keep the case they were set with; lookups ignore case, and setting a
/// name that already exists under another case replaces it in place, so the
/// map never holds two names differing only by case. Repeated values are
/// joined with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets `name` to `value`, replacing any value stored under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i] = (name, value),
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Adds another value for `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => {
                let existing = &mut self.entries[i].1;
                existing.push('\n');
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.set(k, v);
        }
        headers
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}

/// What every application returns.
///
/// The status is kept as a plain integer so that a malformed value can still
/// be represented and reported by the conformance checker.
pub struct Response {
    status: u16,
    headers: Headers,
    body: ResponseBody,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self { status, headers: Headers::new(), body: ResponseBody::empty() }
    }

    /// A response with a `text/plain` body and its `Content-Length`.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(status)
            .with_header(http::header::CONTENT_TYPE.as_str(), mime::TEXT_PLAIN.as_ref())
            .with_header(http::header::CONTENT_LENGTH.as_str(), body.len().to_string())
            .with_body(body)
    }

    pub fn from_parts(status: u16, headers: Headers, body: ResponseBody) -> Self {
        Self { status, headers, body }
    }

    pub fn into_parts(self) -> (u16, Headers, ResponseBody) {
        (self.status, self.headers, self.body)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// Swaps the body for `body`, returning the previous one.
    pub fn replace_body(&mut self, body: ResponseBody) -> ResponseBody {
        std::mem::replace(&mut self.body, body)
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Self::new(status.as_u16())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}
