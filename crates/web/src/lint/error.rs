use thiserror::Error;

/// A violation of the calling convention, found by [`Lint`](super::Lint).
///
/// It travels up the stack as a regular [`BoxError`]; use
/// [`LintError::from_box`] to tell it apart from application failures.
///
/// [`BoxError`]: lack_http::protocol::BoxError
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LintError {
    message: String,
}

impl LintError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The lint error carried by `error`, if it is one.
    pub fn from_box<'a>(error: &'a (dyn std::error::Error + Send + Sync + 'static)) -> Option<&'a Self> {
        error.downcast_ref::<Self>()
    }
}
