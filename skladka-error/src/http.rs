//! HTTP status mapping

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use crate::chain;
use crate::error::{BoxError, Cause};
use crate::render::{write_quoted, Directive, Render, Verb};
use crate::stack::StackTrace;

/// An error carrying an HTTP status code.
///
/// Only `code` and `message` serialize; the cause and the stack stay
/// server side.
///
/// ```rust
/// use skladka_error::{Error, HttpError};
///
/// let err = HttpError::with_cause(500, "database error", Error::new("connection reset"));
/// assert_eq!(err.to_string(), "database error: connection reset");
/// assert!(err.is_server_error());
/// ```
#[derive(Clone, Serialize)]
pub struct HttpError {
    code: u16,
    message: Cow<'static, str>,
    #[serde(skip)]
    cause: Option<Cause>,
    #[serde(skip)]
    stack: StackTrace,
}

/// 404 "Resource not found"
pub static NOT_FOUND: HttpError = HttpError::sentinel(404, "Resource not found");
/// 400 "Bad request"
pub static BAD_REQUEST: HttpError = HttpError::sentinel(400, "Bad request");
/// 401 "Unauthorized"
pub static UNAUTHORIZED: HttpError = HttpError::sentinel(401, "Unauthorized");
/// 403 "Forbidden"
pub static FORBIDDEN: HttpError = HttpError::sentinel(403, "Forbidden");
/// 500 "Internal server error"
pub static INTERNAL_SERVER: HttpError = HttpError::sentinel(500, "Internal server error");
/// 503 "Service unavailable"
pub static SERVICE_UNAVAILABLE: HttpError = HttpError::sentinel(503, "Service unavailable");

const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

impl HttpError {
    /// Create an HTTP error with no cause.
    #[inline(never)]
    pub fn new(code: u16, message: impl Into<Cow<'static, str>>) -> Self {
        HttpError {
            code,
            message: message.into(),
            cause: None,
            stack: StackTrace::capture(1),
        }
    }

    /// Create an HTTP error over `cause`, reachable through `source()`.
    #[inline(never)]
    pub fn with_cause(
        code: u16,
        message: impl Into<Cow<'static, str>>,
        cause: impl Into<BoxError>,
    ) -> Self {
        HttpError {
            code,
            message: message.into(),
            cause: Some(Cause::new(cause)),
            stack: StackTrace::capture(1),
        }
    }

    const fn sentinel(code: u16, message: &'static str) -> Self {
        HttpError {
            code,
            message: Cow::Borrowed(message),
            cause: None,
            stack: StackTrace::empty(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(Cause::as_error)
    }

    pub fn stack_trace(&self) -> &StackTrace {
        &self.stack
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub(crate) fn cause_slot(&self) -> &[Cause] {
        match &self.cause {
            Some(cause) => std::slice::from_ref(cause),
            None => &[],
        }
    }

    /// Same status and message; causes and stacks are not compared.
    pub(crate) fn matches(&self, other: &HttpError) -> bool {
        self.code == other.code && self.message == other.message
    }

    pub(crate) fn write_plain(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(cause) = &self.cause {
            f.write_str(": ")?;
            cause.write_plain(f)?;
        }
        Ok(())
    }

    pub(crate) fn write_detailed(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            cause.write_detailed(f)?;
        }
        self.stack.render(f, Directive::DETAILED)
    }
}

impl Render for HttpError {
    fn render(&self, f: &mut fmt::Formatter<'_>, directive: Directive) -> fmt::Result {
        match directive.verb {
            Verb::Value if directive.detailed => self.write_detailed(f),
            Verb::Quoted => write_quoted(f, &self.to_string()),
            _ => self.write_plain(f),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            self.write_detailed(f)
        } else {
            self.write_plain(f)
        }
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_detailed(f)
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause()
    }
}

/// Coerce any error into an [`HttpError`].
///
/// The first `HttpError` in the chain is returned as is. Anything else,
/// including `None`, becomes a 500 "Internal Server Error" that keeps the
/// original error as its cause.
#[inline(never)]
pub fn as_http_error<E>(err: Option<E>) -> HttpError
where
    E: Into<BoxError>,
{
    let cause = err.map(Cause::new);
    if let Some(found) = cause.as_ref().and_then(|c| chain::find::<HttpError>(c.as_error())) {
        return found.clone();
    }
    HttpError {
        code: 500,
        message: Cow::Borrowed(INTERNAL_SERVER_ERROR),
        cause,
        stack: StackTrace::capture(1),
    }
}

fn has_code(err: &(dyn StdError + 'static), code: u16) -> bool {
    chain::find::<HttpError>(err).is_some_and(|http| http.code == code)
}

/// Whether the first HTTP error in the chain is a 404.
pub fn is_not_found(err: &(dyn StdError + 'static)) -> bool {
    has_code(err, 404)
}

/// Whether the first HTTP error in the chain is a 400.
pub fn is_bad_request(err: &(dyn StdError + 'static)) -> bool {
    has_code(err, 400)
}

/// Whether the first HTTP error in the chain is a 401.
pub fn is_unauthorized(err: &(dyn StdError + 'static)) -> bool {
    has_code(err, 401)
}

/// Whether the first HTTP error in the chain is a 403.
pub fn is_forbidden(err: &(dyn StdError + 'static)) -> bool {
    has_code(err, 403)
}

/// Whether the first HTTP error in the chain is a 500.
pub fn is_internal_server(err: &(dyn StdError + 'static)) -> bool {
    has_code(err, 500)
}
