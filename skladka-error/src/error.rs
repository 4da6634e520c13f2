//! The error value and its constructors

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::chain;
use crate::http::HttpError;
use crate::render::{write_quoted, Directive, Render, Verb};
use crate::stack::StackTrace;
use crate::ErrorKind;

/// Any foreign error accepted as a cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A structured error value.
///
/// Every `Error` is one of five shapes:
/// - **Fundamental**: a new failure, with a message and the stack where it was built
/// - **WithStack**: an existing error plus the stack where it was annotated
/// - **WithMessage**: an existing error with a message prepended
/// - **Multi**: several independent errors joined into one
/// - **Http**: an [`HttpError`] carrying a status code
///
/// Values are immutable once built. Cloning is cheap and shares the node,
/// and `==` compares node identity: two separate `Error::new("x")` are not
/// equal, while [`Error::is`] reports them as matching.
///
/// # Example
///
/// ```rust
/// use skladka_error::Error;
///
/// let err = Error::wrap(Error::new("connection refused"), "loading paste");
/// assert_eq!(err.to_string(), "loading paste: connection refused");
///
/// // `{:#}` adds the stack traces
/// assert!(format!("{:#}", err).starts_with("connection refused\n"));
/// ```
#[derive(Clone)]
pub struct Error {
    inner: Arc<Repr>,
}

pub(crate) enum Repr {
    Fundamental {
        message: String,
        stack: StackTrace,
    },
    WithStack {
        cause: Cause,
        stack: StackTrace,
    },
    WithMessage {
        cause: Cause,
        message: String,
        // Stored for `stack_trace()`, never rendered.
        stack: StackTrace,
    },
    Multi {
        causes: Vec<Cause>,
        stack: StackTrace,
    },
    Http(HttpError),
}

/// The error an annotation wraps: one of ours, or an opaque foreign value.
#[derive(Clone)]
pub(crate) enum Cause {
    Node(Error),
    Foreign(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Cause {
    pub(crate) fn new(err: impl Into<BoxError>) -> Self {
        let err: BoxError = err.into();
        match err.downcast::<Error>() {
            Ok(node) => Cause::Node(*node),
            Err(err) => match err.downcast::<HttpError>() {
                Ok(http) => Cause::Node(Error::from(*http)),
                Err(err) => Cause::Foreign(Arc::from(err)),
            },
        }
    }

    pub(crate) fn as_error(&self) -> &(dyn StdError + 'static) {
        match self {
            Cause::Node(node) => node,
            Cause::Foreign(err) => &**err,
        }
    }

    pub(crate) fn write_plain(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Node(node) => node.write_plain(f),
            Cause::Foreign(err) => write!(f, "{}", err),
        }
    }

    pub(crate) fn write_detailed(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Node(node) => node.write_detailed(f),
            Cause::Foreign(err) => write!(f, "{}", err),
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

impl Error {
    /// Create a new error with the given message and the caller's stack.
    #[inline(never)]
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_repr(Repr::Fundamental {
            message: message.into(),
            stack: StackTrace::capture(1),
        })
    }

    /// Annotate `cause` with a message and the stack at this call.
    ///
    /// The message renders as `message: cause`.
    #[inline(never)]
    pub fn wrap(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::wrapped(Cause::new(cause), message.into(), StackTrace::capture(1))
    }

    /// Annotate `cause` with the stack at this call, keeping its message.
    #[inline(never)]
    pub fn with_stack(cause: impl Into<BoxError>) -> Self {
        Self::stacked(Cause::new(cause), StackTrace::capture(1))
    }

    /// Prepend a message to `cause`, keeping its stack as the one that renders.
    #[inline(never)]
    pub fn with_message(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::annotated(Cause::new(cause), message.into(), StackTrace::capture(1))
    }

    pub(crate) fn wrapped(cause: Cause, message: String, stack: StackTrace) -> Self {
        let annotated = Self::annotated(cause, message, stack.clone());
        Self::stacked(Cause::Node(annotated), stack)
    }

    pub(crate) fn stacked(cause: Cause, stack: StackTrace) -> Self {
        Self::from_repr(Repr::WithStack { cause, stack })
    }

    pub(crate) fn annotated(cause: Cause, message: String, stack: StackTrace) -> Self {
        Self::from_repr(Repr::WithMessage {
            cause,
            message,
            stack,
        })
    }

    fn from_repr(repr: Repr) -> Self {
        Self {
            inner: Arc::new(repr),
        }
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.inner
    }
}

/// Like [`Error::wrap`], but `None` in gives `None` out.
#[inline(never)]
pub fn wrap<E>(cause: Option<E>, message: impl Into<String>) -> Option<Error>
where
    E: Into<BoxError>,
{
    let cause = cause?;
    Some(Error::wrapped(
        Cause::new(cause),
        message.into(),
        StackTrace::capture(1),
    ))
}

/// Like [`Error::with_stack`], but `None` in gives `None` out.
#[inline(never)]
pub fn with_stack<E>(cause: Option<E>) -> Option<Error>
where
    E: Into<BoxError>,
{
    let cause = cause?;
    Some(Error::stacked(Cause::new(cause), StackTrace::capture(1)))
}

/// Like [`Error::with_message`], but `None` in gives `None` out.
#[inline(never)]
pub fn with_message<E>(cause: Option<E>, message: impl Into<String>) -> Option<Error>
where
    E: Into<BoxError>,
{
    let cause = cause?;
    Some(Error::annotated(
        Cause::new(cause),
        message.into(),
        StackTrace::capture(1),
    ))
}

/// Join errors into one, discarding `None` entries.
///
/// Returns `None` when nothing is left. The joined message is each error's
/// message on its own line, in order.
///
/// ```rust
/// use skladka_error::{join, Error};
///
/// let err = join([Some(Error::new("empty title")), None, Some(Error::new("no content"))]);
/// assert_eq!(err.unwrap().to_string(), "empty title\nno content");
/// ```
#[inline(never)]
pub fn join<I, E>(errs: I) -> Option<Error>
where
    I: IntoIterator<Item = Option<E>>,
    E: Into<BoxError>,
{
    let causes: Vec<Cause> = errs.into_iter().flatten().map(Cause::new).collect();
    if causes.is_empty() {
        return None;
    }
    Some(Error::from_repr(Repr::Multi {
        causes,
        stack: StackTrace::capture(1),
    }))
}

// =============================================================================
// Getters
// =============================================================================

impl Error {
    /// Which of the five shapes this is
    pub fn kind(&self) -> ErrorKind {
        match self.repr() {
            Repr::Fundamental { .. } => ErrorKind::Fundamental,
            Repr::WithStack { .. } => ErrorKind::WithStack,
            Repr::WithMessage { .. } => ErrorKind::WithMessage,
            Repr::Multi { .. } => ErrorKind::Multi,
            Repr::Http(_) => ErrorKind::Http,
        }
    }

    /// This node's own message, without its causes
    pub fn message(&self) -> Option<&str> {
        match self.repr() {
            Repr::Fundamental { message, .. } | Repr::WithMessage { message, .. } => {
                Some(message.as_str())
            }
            Repr::Http(http) => Some(http.message()),
            Repr::WithStack { .. } | Repr::Multi { .. } => None,
        }
    }

    /// The stack captured when this node was built
    pub fn stack_trace(&self) -> &StackTrace {
        match self.repr() {
            Repr::Fundamental { stack, .. }
            | Repr::WithStack { stack, .. }
            | Repr::WithMessage { stack, .. }
            | Repr::Multi { stack, .. } => stack,
            Repr::Http(http) => http.stack_trace(),
        }
    }

    /// The status-code payload, if this node is an HTTP error
    pub fn as_http(&self) -> Option<&HttpError> {
        match self.repr() {
            Repr::Http(http) => Some(http),
            _ => None,
        }
    }

    /// The immediate causes: none, one, or every joined error in order.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> + '_ {
        let causes: &[Cause] = match self.repr() {
            Repr::Fundamental { .. } => &[],
            Repr::WithStack { cause, .. } | Repr::WithMessage { cause, .. } => {
                std::slice::from_ref(cause)
            }
            Repr::Multi { causes, .. } => causes,
            Repr::Http(http) => http.cause_slot(),
        };
        causes.iter().map(Cause::as_error)
    }

    /// Follow single causes down to the innermost error. See [`chain::cause`].
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        chain::cause(self)
    }

    /// Whether any error in this chain matches `target`. See [`chain::is`].
    pub fn is(&self, target: &(dyn StdError + 'static)) -> bool {
        chain::is(self, target)
    }

    /// The first error of type `T` in this chain. See [`chain::find`].
    pub fn find<T: StdError + 'static>(&self) -> Option<&T> {
        chain::find::<T>(self)
    }
}

// =============================================================================
// Rendering
// =============================================================================

impl Error {
    pub(crate) fn write_plain(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Repr::Fundamental { message, .. } => f.write_str(message),
            Repr::WithStack { cause, .. } => cause.write_plain(f),
            Repr::WithMessage { cause, message, .. } => {
                write!(f, "{}: ", message)?;
                cause.write_plain(f)
            }
            Repr::Multi { causes, .. } => {
                for (i, cause) in causes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    cause.write_plain(f)?;
                }
                Ok(())
            }
            Repr::Http(http) => http.write_plain(f),
        }
    }

    pub(crate) fn write_detailed(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Repr::Fundamental { message, stack } => {
                f.write_str(message)?;
                stack.render(f, Directive::DETAILED)
            }
            Repr::WithStack { cause, stack } => {
                cause.write_detailed(f)?;
                stack.render(f, Directive::DETAILED)
            }
            Repr::WithMessage { cause, message, .. } => {
                cause.write_detailed(f)?;
                write!(f, "\n{}", message)
            }
            Repr::Multi { causes, stack } => {
                for (i, cause) in causes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    cause.write_detailed(f)?;
                }
                stack.render(f, Directive::DETAILED)
            }
            Repr::Http(http) => http.write_detailed(f),
        }
    }
}

impl Render for Error {
    fn render(&self, f: &mut fmt::Formatter<'_>, directive: Directive) -> fmt::Result {
        match directive.verb {
            Verb::Value if directive.detailed => self.write_detailed(f),
            Verb::Quoted => write_quoted(f, &self.to_string()),
            _ => self.write_plain(f),
        }
    }
}

// =============================================================================
// Display - the one-line message chain; `{:#}` adds stack traces
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detailed = f.alternate();
        self.render(f, Directive::new(Verb::Value, detailed))
    }
}

// =============================================================================
// Debug - messages with every stack trace, for diagnostics
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_detailed(f)
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl StdError for Error {
    /// The single cause of a wrapper. Joined errors expose theirs through
    /// [`Error::causes`].
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.repr() {
            Repr::WithStack { cause, .. } | Repr::WithMessage { cause, .. } => {
                Some(cause.as_error())
            }
            Repr::Http(http) => http.cause(),
            Repr::Fundamental { .. } | Repr::Multi { .. } => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Error {}

// =============================================================================
// Conversions
// =============================================================================

impl From<HttpError> for Error {
    fn from(http: HttpError) -> Self {
        Self::from_repr(Repr::Http(http))
    }
}

impl From<anyhow::Error> for Error {
    /// Recover the node an `anyhow::Error` carries, or annotate the foreign
    /// error with a stack.
    #[inline(never)]
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(node) => node,
            Err(err) => match err.downcast::<HttpError>() {
                Ok(http) => Error::from(http),
                Err(err) => Self::stacked(Cause::new(err), StackTrace::capture(1)),
            },
        }
    }
}
