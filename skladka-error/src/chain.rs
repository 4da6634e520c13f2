//! Walking error chains.
//!
//! These work on any `&dyn std::error::Error`. Our own nodes are
//! traversed through every cause they hold, joined errors included;
//! foreign errors through `source()`.

use std::error::Error as StdError;

use crate::error::Repr;
use crate::{Error, HttpError};

/// Follow the single-cause relation to the innermost error.
///
/// Annotations and HTTP errors expose their cause; fundamental and joined
/// errors do not, and neither do foreign ones. The error itself is
/// returned when it has no cause.
pub fn cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(next) = single_cause(current) {
        current = next;
    }
    current
}

fn single_cause<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    if let Some(node) = err.downcast_ref::<Error>() {
        return match node.repr() {
            Repr::WithStack { cause, .. } | Repr::WithMessage { cause, .. } => {
                Some(cause.as_error())
            }
            Repr::Http(http) => http.cause(),
            Repr::Fundamental { .. } | Repr::Multi { .. } => None,
        };
    }
    err.downcast_ref::<HttpError>().and_then(HttpError::cause)
}

/// Whether `err` or anything it wraps matches `target`.
///
/// The same value always matches. Beyond that, a fundamental error matches
/// another fundamental error with the same message, and an HTTP error
/// matches any HTTP error with the same code and message. Joined errors
/// match when any of their causes does.
pub fn is(err: &(dyn StdError + 'static), target: &(dyn StdError + 'static)) -> bool {
    if same(err, target) {
        return true;
    }

    if let Some(node) = err.downcast_ref::<Error>() {
        return match node.repr() {
            Repr::Fundamental { message, .. } => target
                .downcast_ref::<Error>()
                .is_some_and(|t| matches!(t.repr(), Repr::Fundamental { message: m, .. } if m == message)),
            Repr::WithStack { cause, .. } | Repr::WithMessage { cause, .. } => {
                is(cause.as_error(), target)
            }
            Repr::Multi { causes, .. } => causes.iter().any(|c| is(c.as_error(), target)),
            Repr::Http(http) => http_is(http, target),
        };
    }
    if let Some(http) = err.downcast_ref::<HttpError>() {
        return http_is(http, target);
    }
    err.source().is_some_and(|next| is(next, target))
}

fn http_is(http: &HttpError, target: &(dyn StdError + 'static)) -> bool {
    let target_http = target
        .downcast_ref::<HttpError>()
        .or_else(|| target.downcast_ref::<Error>().and_then(Error::as_http));
    if target_http.is_some_and(|t| http.matches(t)) {
        return true;
    }
    http.cause().is_some_and(|cause| is(cause, target))
}

fn same(a: &(dyn StdError + 'static), b: &(dyn StdError + 'static)) -> bool {
    match (a.downcast_ref::<Error>(), b.downcast_ref::<Error>()) {
        (Some(a), Some(b)) => a == b,
        _ => std::ptr::addr_eq(a as *const dyn StdError, b as *const dyn StdError),
    }
}

/// The first error of type `T` in the chain, depth first.
///
/// An [`Error`] wrapping an HTTP payload also yields it as [`HttpError`].
pub fn find<'a, T>(err: &'a (dyn StdError + 'static)) -> Option<&'a T>
where
    T: StdError + 'static,
{
    if let Some(found) = err.downcast_ref::<T>() {
        return Some(found);
    }
    if let Some(node) = err.downcast_ref::<Error>() {
        if let Some(http) = node.as_http() {
            let http: &(dyn StdError + 'static) = http;
            if let Some(found) = http.downcast_ref::<T>() {
                return Some(found);
            }
        }
        return node.causes().find_map(|c| find::<T>(c));
    }
    err.source().and_then(|next| find::<T>(next))
}
