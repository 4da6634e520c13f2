//! Formatted constructors.
//!
//! Each macro formats its arguments with `format!` and calls the matching
//! constructor, so the captured stack starts at the macro's call site.

/// Create a new [`Error`](crate::Error) from a format string.
///
/// ```rust
/// use skladka_error::errorf;
///
/// let err = errorf!("paste {} expired", "a1b2");
/// assert_eq!(err.to_string(), "paste a1b2 expired");
/// ```
#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => {
        $crate::Error::new(::std::format!($($arg)+))
    };
}

/// [`Error::wrap`](crate::Error::wrap) with a formatted message.
///
/// ```rust
/// use skladka_error::{wrapf, Error};
///
/// let err = wrapf!(Error::new("timeout"), "fetching {}", "/v1/paste");
/// assert_eq!(err.to_string(), "fetching /v1/paste: timeout");
/// ```
#[macro_export]
macro_rules! wrapf {
    ($cause:expr, $($arg:tt)+) => {
        $crate::Error::wrap($cause, ::std::format!($($arg)+))
    };
}

/// [`Error::with_message`](crate::Error::with_message) with a formatted
/// message.
#[macro_export]
macro_rules! with_messagef {
    ($cause:expr, $($arg:tt)+) => {
        $crate::Error::with_message($cause, ::std::format!($($arg)+))
    };
}
