use std::error::Error;
use thiserror::Error;

/// The error type every application, middleware and stream returns.
///
/// Errors raised by user code travel through the chain unchanged, so callers
/// recognise specific kinds (for example conformance errors) by downcasting.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream is closed")]
    Closed,
}
