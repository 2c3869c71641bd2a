use lack_http::protocol::{BoxError, ErrorStream};

use super::LintError;

/// Lets the application write to the error stream but not close it.
#[derive(Debug)]
pub(crate) struct ErrorWrapper {
    errors: Box<dyn ErrorStream>,
}

impl ErrorWrapper {
    pub(crate) fn new(errors: Box<dyn ErrorStream>) -> Self {
        Self { errors }
    }
}

impl ErrorStream for ErrorWrapper {
    fn puts(&mut self, message: &str) -> Result<(), BoxError> {
        self.errors.puts(message)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BoxError> {
        self.errors.write(data)
    }

    fn flush(&mut self) -> Result<(), BoxError> {
        self.errors.flush()
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Err(LintError::new("close must not be called on the error stream").into())
    }
}
