use bytes::Bytes;
use lack_http::protocol::{BoxError, Body, ResponseBody};

use super::LintError;

/// Watches the response body while the server drains it.
///
/// The length checks can only run once the body is exhausted, so their
/// failures surface from iteration rather than from the application call.
#[derive(Debug)]
pub(crate) struct BodyProxy {
    body: ResponseBody,
    status: u16,
    head_request: bool,
    content_length: Option<String>,
    bytes: usize,
    finished: bool,
    closed: bool,
}

impl BodyProxy {
    pub(crate) fn new(body: ResponseBody, status: u16, head_request: bool, content_length: Option<String>) -> Self {
        Self { body, status, head_request, content_length, bytes: 0, finished: false, closed: false }
    }

    fn fail(&mut self, message: String) -> Option<Result<Bytes, BoxError>> {
        self.finished = true;
        Some(Err(LintError::new(message).into()))
    }

    fn verify_length(&self) -> Result<(), LintError> {
        if self.head_request {
            return Ok(());
        }
        match &self.content_length {
            Some(declared) if *declared != self.bytes.to_string() => Err(LintError::new(format!(
                "Content-Length header was {declared}, but should be {}",
                self.bytes
            ))),
            _ => Ok(()),
        }
    }
}

impl Body for BodyProxy {
    fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>> {
        if self.finished {
            return None;
        }
        if self.closed {
            return self.fail("Response body was read after it was closed".into());
        }

        match self.body.next_chunk() {
            Some(Ok(chunk)) => {
                self.bytes += chunk.len();
                if self.head_request && !chunk.is_empty() {
                    return self.fail("Response body was given for HEAD request, but should be empty".into());
                }
                if super::forbids_body(self.status) && !chunk.is_empty() {
                    let status = self.status;
                    return self.fail(format!("Response body was given for {status} response, but should be empty"));
                }
                Some(Ok(chunk))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                self.finished = true;
                self.verify_length().err().map(|e| Err(e.into()))
            }
        }
    }

    fn close(&mut self) -> Result<(), BoxError> {
        if self.closed {
            return Err(LintError::new("Response body closed twice").into());
        }
        self.closed = true;
        self.body.close()
    }
}
