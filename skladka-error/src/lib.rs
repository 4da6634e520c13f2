//! # skladka-error
//!
//! Structured error values for skladka: every failure carries a message
//! chain, the call stack where it was created or annotated, and optionally
//! several joined causes or an HTTP status.
//!
//! ## Shapes
//!
//! - **Fundamental**: a new failure (`Error::new`, `errorf!`)
//! - **WithStack**: a cause plus the stack where it passed through (`Error::with_stack`)
//! - **WithMessage**: a cause with a message prepended (`Error::with_message`)
//! - **Multi**: independent failures joined into one (`join`)
//! - **Http**: a status code and message for the API boundary (`HttpError`)
//!
//! `Error::wrap` is the usual annotation: a message plus a fresh stack.
//!
//! ## Usage
//!
//! ```rust
//! use skladka_error::{as_http_error, is_not_found, Error, HttpError, ResultExt};
//!
//! fn find_paste(id: &str) -> skladka_error::Result<String> {
//!     Err(HttpError::new(404, format!("paste {} not found", id))).wrap_err("loading paste")
//! }
//!
//! let err = find_paste("a1b2").unwrap_err();
//! assert_eq!(err.to_string(), "loading paste: paste a1b2 not found");
//! assert!(is_not_found(&err));
//!
//! let http = as_http_error(Some(err));
//! assert_eq!(http.code(), 404);
//! ```
//!
//! ## Rendering
//!
//! - `{}`: the one-line message chain, `outer: inner: root`
//! - `{:#}` and `{:?}`: the chain with a stack trace per stack-bearing layer
//! - [`Directive`] and [`Render`] reach the remaining forms (`%q`, and the
//!   per-frame `%s`, `%d`, `%n`)
//!
//! ## Principles
//!
//! - Wrapping nothing yields nothing: the `Option`-taking [`wrap`],
//!   [`with_stack`], [`with_message`] and [`join`] map `None` to `None`
//! - Values are immutable; `==` is identity, [`is`] is matching
//! - Only [`Error::log`] and [`log_error`] have side effects

mod chain;
mod error;
mod ext;
mod http;
mod kind;
mod macros;
mod render;
mod report;
mod stack;

pub use chain::{cause, find, is};
pub use error::{join, with_message, with_stack, wrap, BoxError, Error};
pub use ext::ResultExt;
pub use http::{
    as_http_error, is_bad_request, is_forbidden, is_internal_server, is_not_found,
    is_unauthorized, HttpError, BAD_REQUEST, FORBIDDEN, INTERNAL_SERVER, NOT_FOUND,
    SERVICE_UNAVAILABLE, UNAUTHORIZED,
};
pub use kind::ErrorKind;
pub use render::{Directive, Render, Rendered, Verb};
pub use report::{log_error, LogFields};
pub use stack::{Frame, StackTrace, MAX_DEPTH};

/// Result type alias using skladka Error
pub type Result<T> = std::result::Result<T, Error>;
