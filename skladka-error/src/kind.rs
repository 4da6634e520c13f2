//! Error kinds for skladka errors

use std::error::Error as StdError;
use std::fmt;

use crate::{Error, HttpError};

/// The shape of an [`Error`] node.
///
/// Callers rarely need to branch on this; it exists for logging and for
/// the renderer, which treats each shape differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A new error: message plus the stack where it was created
    Fundamental,

    /// An existing error annotated with a stack
    WithStack,

    /// An existing error with a message prepended
    WithMessage,

    /// Several errors joined into one
    Multi,

    /// An error carrying an HTTP status code
    Http,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fundamental => "Fundamental",
            ErrorKind::WithStack => "WithStack",
            ErrorKind::WithMessage => "WithMessage",
            ErrorKind::Multi => "Multi",
            ErrorKind::Http => "Http",
        }
    }

    /// Whether the detailed form prints this node's own stack.
    ///
    /// A message annotation records a stack but never renders it.
    pub fn has_printable_stack(&self) -> bool {
        !matches!(self, ErrorKind::WithMessage)
    }

    /// Check if this kind only annotates another error
    pub fn is_wrapper(&self) -> bool {
        matches!(self, ErrorKind::WithStack | ErrorKind::WithMessage)
    }

    /// The kind of any error value, or `None` for foreign errors.
    ///
    /// A bare [`HttpError`] reports [`ErrorKind::Http`].
    pub fn of(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
        if let Some(node) = err.downcast_ref::<Error>() {
            return Some(node.kind());
        }
        err.downcast_ref::<HttpError>().map(|_| ErrorKind::Http)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
