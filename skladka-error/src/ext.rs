//! Annotating errors on `Result`

use crate::error::{BoxError, Cause};
use crate::stack::StackTrace;
use crate::Error;

/// Extension trait for annotating the error side of any `Result`.
///
/// `Ok` values pass through untouched; only failures pay for a stack
/// capture.
///
/// ```rust
/// use skladka_error::ResultExt;
///
/// fn load(path: &str) -> skladka_error::Result<String> {
///     std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path))
/// }
///
/// let err = load("/definitely/not/here").unwrap_err();
/// assert!(err.to_string().starts_with("reading /definitely/not/here: "));
/// ```
pub trait ResultExt<T> {
    /// [`Error::wrap`] the error with a message.
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Error>;

    /// Like `wrap_err`, building the message only on failure.
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, Error>
    where
        M: Into<String>,
        F: FnOnce() -> M;

    /// [`Error::with_message`] the error.
    fn with_message(self, message: impl Into<String>) -> Result<T, Error>;

    /// [`Error::with_stack`] the error.
    fn with_stack(self) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    #[inline(never)]
    fn wrap_err(self, message: impl Into<String>) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::wrapped(
                Cause::new(err),
                message.into(),
                StackTrace::capture(1),
            )),
        }
    }

    #[inline(never)]
    fn wrap_err_with<M, F>(self, message: F) -> Result<T, Error>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::wrapped(
                Cause::new(err),
                message().into(),
                StackTrace::capture(1),
            )),
        }
    }

    #[inline(never)]
    fn with_message(self, message: impl Into<String>) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::annotated(
                Cause::new(err),
                message.into(),
                StackTrace::capture(1),
            )),
        }
    }

    #[inline(never)]
    fn with_stack(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Error::stacked(Cause::new(err), StackTrace::capture(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io;

    fn read(ok: bool) -> Result<u32, io::Error> {
        if ok {
            Ok(7)
        } else {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF"))
        }
    }

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(read(true).wrap_err("read").unwrap(), 7);
        assert_eq!(read(true).with_message("read").unwrap(), 7);
        assert_eq!(read(true).with_stack().unwrap(), 7);

        let mut called = false;
        let value = read(true).wrap_err_with(|| {
            called = true;
            "read"
        });
        assert_eq!(value.unwrap(), 7);
        assert!(!called);
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_wrap_err() {
        let err = read(false).wrap_err("reading header").unwrap_err();
        assert_eq!(err.to_string(), "reading header: EOF");
        assert_eq!(err.kind(), ErrorKind::WithStack);
        assert!(err.stack_trace().frames()[0]
            .function()
            .ends_with("tests::test_wrap_err"));

        let err = read(false)
            .wrap_err_with(|| format!("reading block {}", 3))
            .unwrap_err();
        assert_eq!(err.to_string(), "reading block 3: EOF");
        assert!(err.stack_trace().frames()[0]
            .function()
            .ends_with("tests::test_wrap_err"));
    }

    #[test]
    fn test_with_message_and_stack() {
        let err = read(false).with_message("header").unwrap_err();
        assert_eq!(err.to_string(), "header: EOF");
        assert_eq!(err.kind(), ErrorKind::WithMessage);

        let err = read(false).with_stack().unwrap_err();
        assert_eq!(err.to_string(), "EOF");
        assert_eq!(err.kind(), ErrorKind::WithStack);
    }

    #[test]
    fn test_chains_our_errors() {
        let inner: Result<(), Error> = Err(Error::new("root"));
        let err = inner.wrap_err("mid").wrap_err("top").unwrap_err();
        assert_eq!(err.to_string(), "top: mid: root");
        assert!(err.is(&Error::new("root")));
    }
}
