use bytes::{Bytes, BytesMut};
use lack_http::protocol::{BoxError, InputStream};

use super::LintError;
use crate::utils::ensure;

/// Checks every read the application makes from the request body.
#[derive(Debug)]
pub(crate) struct InputWrapper {
    input: Box<dyn InputStream>,
    /// Set once a sized read answered `None`; cleared by `rewind`.
    exhausted: bool,
}

impl InputWrapper {
    pub(crate) fn new(input: Box<dyn InputStream>) -> Self {
        Self { input, exhausted: false }
    }

    /// `None` from a sized read claims the end of data, so nothing may follow
    /// it until the stream is rewound.
    fn check_after_end(&mut self, length: Option<usize>, read: Option<&Bytes>) -> Result<(), LintError> {
        match read {
            Some(bytes) if !bytes.is_empty() => ensure!(
                !self.exhausted,
                LintError::new("read returned data after it returned nil at the end of input")
            ),
            None if length.is_some_and(|n| n > 0) => self.exhausted = true,
            _ => {}
        }
        Ok(())
    }
}

fn check_read(length: Option<usize>, read: Option<&Bytes>) -> Result<(), LintError> {
    match (length, read) {
        (None, None) => Err(LintError::new("read(nil) returned nil on EOF")),
        (Some(0), None) => Err(LintError::new("read(0) returned nil, but should return an empty string")),
        (Some(n), Some(bytes)) => {
            ensure!(
                bytes.len() <= n,
                LintError::new(format!("read({n}) returned {} bytes, more than requested", bytes.len()))
            );
            ensure!(
                n == 0 || !bytes.is_empty(),
                LintError::new(format!("read({n}) returned an empty string, but should return nil at the end of input"))
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

impl InputStream for InputWrapper {
    fn gets(&mut self) -> Result<Option<Bytes>, BoxError> {
        let line = self.input.gets()?;
        self.check_after_end(None, line.as_ref())?;
        Ok(line)
    }

    fn read(&mut self, length: Option<usize>, mut buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError> {
        let read = self.input.read(length, buffer.as_deref_mut())?;
        check_read(length, read.as_ref())?;
        self.check_after_end(length, read.as_ref())?;

        if let (Some(buffer), Some(bytes)) = (buffer, &read) {
            ensure!(
                buffer[..] == bytes[..],
                LintError::new("read did not fill the given buffer with the data it returned").into()
            );
        }
        Ok(read)
    }

    fn each(&mut self, f: &mut dyn FnMut(Bytes)) -> Result<(), BoxError> {
        self.input.each(f)
    }

    fn rewind(&mut self) -> Result<(), BoxError> {
        self.input
            .rewind()
            .map_err(|e| LintError::new(format!("rewind raised {e}: the input stream must be rewindable")))?;
        self.exhausted = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Err(LintError::new("close must not be called on the input stream").into())
    }
}

#[cfg(test)]
mod tests {
    use super::InputWrapper;
    use crate::lint::LintError;
    use bytes::{Bytes, BytesMut};
    use lack_http::protocol::{BoxError, InputStream, StringInput};

    fn lint_message(result: Result<Option<Bytes>, BoxError>) -> String {
        let err = result.unwrap_err();
        LintError::from_box(err.as_ref()).unwrap().message().to_owned()
    }

    #[test]
    fn test_reads_pass_through() {
        let mut input = InputWrapper::new(Box::new(StringInput::new("hello world")));

        assert_eq!(input.read(Some(5), None).unwrap(), Some(Bytes::from("hello")));
        assert_eq!(input.read(Some(0), None).unwrap(), Some(Bytes::new()));

        let mut buffer = BytesMut::from("stale");
        assert_eq!(input.read(None, Some(&mut buffer)).unwrap(), Some(Bytes::from(" world")));
        assert_eq!(&buffer[..], b" world");

        assert_eq!(input.read(Some(1), None).unwrap(), None);
        input.rewind().unwrap();
        assert_eq!(input.gets().unwrap(), Some(Bytes::from("hello world")));
    }

    struct Misbehaving {
        answer: Option<Bytes>,
    }

    impl InputStream for Misbehaving {
        fn gets(&mut self) -> Result<Option<Bytes>, BoxError> {
            Ok(self.answer.clone())
        }

        fn read(&mut self, _length: Option<usize>, _buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError> {
            Ok(self.answer.clone())
        }

        fn each(&mut self, _f: &mut dyn FnMut(Bytes)) -> Result<(), BoxError> {
            Ok(())
        }

        fn rewind(&mut self) -> Result<(), BoxError> {
            Err("pipe".into())
        }

        fn close(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn misbehaving(answer: Option<&'static str>) -> InputWrapper {
        InputWrapper::new(Box::new(Misbehaving { answer: answer.map(|s| Bytes::from_static(s.as_bytes())) }))
    }

    #[test]
    fn test_read_nil_on_eof() {
        assert_eq!(lint_message(misbehaving(None).read(None, None)), "read(nil) returned nil on EOF");
    }

    #[test]
    fn test_read_zero_returns_nil() {
        assert!(lint_message(misbehaving(None).read(Some(0), None)).starts_with("read(0) returned nil"));
    }

    #[test]
    fn test_read_too_much() {
        assert!(lint_message(misbehaving(Some("toolong")).read(Some(3), None)).contains("more than requested"));
    }

    #[test]
    fn test_read_empty_instead_of_nil() {
        assert!(lint_message(misbehaving(Some("")).read(Some(3), None)).contains("should return nil"));
    }

    #[test]
    fn test_buffer_not_filled() {
        let mut buffer = BytesMut::new();
        let message = lint_message(misbehaving(Some("abc")).read(Some(3), Some(&mut buffer)));
        assert!(message.contains("did not fill the given buffer"));
    }

    #[test]
    fn test_rewind_and_close() {
        let mut input = misbehaving(None);
        let err = input.rewind().unwrap_err();
        assert!(err.to_string().starts_with("rewind raised pipe"));

        let err = input.close().unwrap_err();
        assert_eq!(err.to_string(), "close must not be called on the input stream");
    }

    /// Claims the end of data on the first read, then keeps producing data.
    struct Resuming {
        reads: usize,
    }

    impl InputStream for Resuming {
        fn gets(&mut self) -> Result<Option<Bytes>, BoxError> {
            Ok(Some(Bytes::from_static(b"line\n")))
        }

        fn read(&mut self, _length: Option<usize>, _buffer: Option<&mut BytesMut>) -> Result<Option<Bytes>, BoxError> {
            self.reads += 1;
            Ok((self.reads > 1).then(|| Bytes::from_static(b"late")))
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

    #[test]
    fn test_data_after_end_of_input() {
        let mut input = InputWrapper::new(Box::new(Resuming { reads: 0 }));
        assert_eq!(input.read(Some(4), None).unwrap(), None);

        let message = lint_message(input.read(Some(4), None));
        assert_eq!(message, "read returned data after it returned nil at the end of input");
        assert!(input.gets().is_err());

        input.rewind().unwrap();
        assert_eq!(input.read(Some(4), None).unwrap(), Some(Bytes::from("late")));
    }
}
