//! Structured logging of errors

use std::error::Error as StdError;

use crate::render::{Directive, Render};
use crate::stack::StackTrace;
use crate::{Error, ErrorKind};

/// The fields an error contributes to a log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFields {
    /// The one-line message chain
    pub message: String,
    /// [`ErrorKind`] name, or `foreign` for errors from other crates
    pub kind: &'static str,
    /// The detailed rendering. Foreign errors carry no stack of their own,
    /// so theirs is captured where the fields are collected.
    pub stack: String,
}

impl LogFields {
    #[inline(never)]
    pub fn of(err: &(dyn StdError + 'static)) -> Self {
        Self::collect(err, 1)
    }

    /// `skip` counts frames above `collect` that belong to the logging path.
    #[inline(never)]
    fn collect(err: &(dyn StdError + 'static), skip: usize) -> Self {
        let kind = ErrorKind::of(err);
        let stack = match kind {
            Some(_) => err
                .downcast_ref::<Error>()
                .map(|node| node.to_string_as(Directive::DETAILED))
                .unwrap_or_else(|| format!("{:#}", err)),
            None => {
                let here = StackTrace::capture(skip + 1);
                here.to_string_as(Directive::DETAILED)
                    .trim_start_matches('\n')
                    .to_string()
            }
        };
        LogFields {
            message: err.to_string(),
            kind: kind.map_or("foreign", |k| k.as_str()),
            stack,
        }
    }
}

/// Log `err` as one ERROR event tagged with `event`.
///
/// The event carries `event`, `error.message`, `error.kind` and
/// `error.stack` fields alongside `message`.
#[inline(never)]
pub fn log_error(err: &(dyn StdError + 'static), event: &str, message: &str) {
    emit(err, event, message, 1)
}

#[inline(never)]
pub(crate) fn emit(err: &(dyn StdError + 'static), event: &str, message: &str, skip: usize) {
    let fields = LogFields::collect(err, skip + 1);
    tracing::error!(
        event = event,
        error.message = %fields.message,
        error.kind = fields.kind,
        error.stack = %fields.stack,
        "{}",
        message
    );
}

impl Error {
    /// Log this error as one ERROR event. See [`log_error`].
    #[inline(never)]
    pub fn log(&self, event: &str, message: &str) {
        emit(self, event, message, 1)
    }

    /// The fields [`Error::log`] would attach.
    #[inline(never)]
    pub fn log_fields(&self) -> LogFields {
        LogFields::collect(self, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpError;
    use std::fmt;
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    type Records = Arc<Mutex<Vec<Vec<(String, String)>>>>;

    /// Keeps every event's fields.
    struct Capture(Records);

    struct Fields<'a>(&'a mut Vec<(String, String)>);

    impl Visit for Fields<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            assert_eq!(*event.metadata().level(), Level::ERROR);
            let mut fields = Vec::new();
            event.record(&mut Fields(&mut fields));
            self.0.lock().unwrap().push(fields);
        }
    }

    fn captured(f: impl FnOnce()) -> Vec<Vec<(String, String)>> {
        let records = Records::default();
        let subscriber = tracing_subscriber::registry().with(Capture(records.clone()));
        tracing::subscriber::with_default(subscriber, f);
        let fields = records.lock().unwrap().clone();
        fields
    }

    fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| panic!("missing field {}", name))
    }

    #[test]
    fn test_log_fields_of_node() {
        let err = Error::wrap(Error::new("disk full"), "saving paste");
        let fields = err.log_fields();
        assert_eq!(fields.message, "saving paste: disk full");
        assert_eq!(fields.kind, "WithStack");
        assert_eq!(fields.stack, format!("{:#}", err));
        assert_eq!(LogFields::of(&err), fields);
    }

    #[test]
    fn test_log_fields_of_http() {
        let fields = LogFields::of(&HttpError::new(404, "gone"));
        assert_eq!(fields.kind, "Http");
        assert!(fields.stack.starts_with("gone\n"));
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_log_fields_of_foreign() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "EOF");
        let fields = LogFields::of(&err);
        assert_eq!(fields.message, "EOF");
        assert_eq!(fields.kind, "foreign");
        let first = fields.stack.lines().next().unwrap();
        assert!(first.ends_with("tests::test_log_fields_of_foreign"), "{}", first);
    }

    #[test]
    fn test_log_emits_one_event() {
        let err = Error::wrap(Error::new("connection reset"), "fetching paste");
        let records = captured(|| err.log("paste.fetch", "could not fetch paste"));

        assert_eq!(records.len(), 1);
        let fields = &records[0];
        assert_eq!(field(fields, "message"), "could not fetch paste");
        assert_eq!(field(fields, "event"), "paste.fetch");
        assert_eq!(field(fields, "error.message"), "fetching paste: connection reset");
        assert_eq!(field(fields, "error.kind"), "WithStack");
        assert!(field(fields, "error.stack").starts_with("connection reset\n"));
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_log_error_foreign_stack_starts_at_call_site() {
        let err = io::Error::new(io::ErrorKind::Other, "broken pipe");
        let records = captured(|| log_error(&err, "paste.store", "store failed"));

        let fields = &records[0];
        assert_eq!(field(fields, "error.kind"), "foreign");
        let first = field(fields, "error.stack").lines().next().unwrap().to_string();
        assert!(
            first.contains("tests::test_log_error_foreign_stack_starts_at_call_site"),
            "{}",
            first
        );
    }
}
