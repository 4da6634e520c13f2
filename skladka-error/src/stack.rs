//! Call-stack capture.
//!
//! A [`StackTrace`] keeps raw return addresses only. Function names, files
//! and lines are resolved when a frame is rendered, so an error that is never
//! printed costs one unwind and a small vector.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::render::{write_quoted, Directive, Render, Verb};

/// Maximum number of frames recorded by a single capture.
pub const MAX_DEPTH: usize = 32;

/// Frames inspected while looking for the capture anchor before giving up.
const SCAN_LIMIT: usize = 128;

/// A single program location.
///
/// Wraps the return address of one call. [`Frame::UNKNOWN`] never resolves
/// and renders as `unknown`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame(usize);

/// Symbol information for one frame, resolved on demand.
struct Symbol {
    function: Option<String>,
    file: Option<PathBuf>,
    line: u32,
}

impl Frame {
    /// The zero frame.
    pub const UNKNOWN: Frame = Frame(0);

    /// Build a frame from a raw return address.
    pub const fn from_ip(ip: usize) -> Self {
        Frame(ip)
    }

    /// The raw return address.
    pub fn ip(&self) -> usize {
        self.0
    }

    /// Fully qualified function name, or `unknown`.
    pub fn function(&self) -> String {
        self.resolve().function.unwrap_or_else(|| "unknown".to_string())
    }

    /// Full path of the source file, or `unknown`.
    pub fn file(&self) -> String {
        match self.resolve().file {
            Some(file) => file.display().to_string(),
            None => "unknown".to_string(),
        }
    }

    /// Source line, `0` when unresolved.
    pub fn line(&self) -> u32 {
        self.resolve().line
    }

    /// Function name without its module path, or `unknown`.
    pub fn name(&self) -> String {
        match self.resolve().function {
            Some(function) => funcname(&function).to_string(),
            None => "unknown".to_string(),
        }
    }

    fn resolve(&self) -> Symbol {
        let mut symbol = Symbol {
            function: None,
            file: None,
            line: 0,
        };
        if self.0 == 0 {
            return symbol;
        }

        // Inlined calls report several symbols, innermost first.
        let mut seen = false;
        backtrace::resolve(self.0 as *mut c_void, |resolved| {
            if seen {
                return;
            }
            seen = true;
            symbol.function = resolved.name().map(|name| format!("{:#}", name));
            symbol.file = resolved.filename().map(Path::to_path_buf);
            symbol.line = resolved.lineno().unwrap_or(0);
        });
        symbol
    }
}

impl Symbol {
    fn function(&self) -> &str {
        self.function.as_deref().unwrap_or("unknown")
    }

    fn file(&self) -> String {
        match &self.file {
            Some(file) => file.display().to_string(),
            None => "unknown".to_string(),
        }
    }

    fn base_name(&self) -> String {
        match self.file.as_deref().and_then(Path::file_name) {
            Some(name) => name.to_string_lossy().into_owned(),
            None => "unknown".to_string(),
        }
    }
}

impl Render for Frame {
    fn render(&self, f: &mut fmt::Formatter<'_>, directive: Directive) -> fmt::Result {
        let symbol = self.resolve();
        match directive.verb {
            Verb::Str if directive.detailed => {
                write!(f, "{}\n\t{}", symbol.function(), symbol.file())
            }
            Verb::Str => f.write_str(&symbol.base_name()),
            Verb::Line => write!(f, "{}", symbol.line),
            Verb::Name => f.write_str(funcname(symbol.function())),
            Verb::Quoted => {
                write_quoted(f, &format!("{}:{}", symbol.base_name(), symbol.line))
            }
            Verb::Value if directive.detailed => {
                write!(f, "{}\n\t{}:{}", symbol.function(), symbol.file(), symbol.line)
            }
            Verb::Value => write!(f, "{}:{}", symbol.base_name(), symbol.line),
        }
    }
}

/// `file:line`, or `function\n\tpath:line` with `{:#}`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detailed = f.alternate();
        self.render(f, Directive::new(Verb::Value, detailed))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, Directive::VALUE)
    }
}

/// Frames of one capture, innermost call site first.
///
/// Captured once when an error is built and never modified afterwards.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct StackTrace {
    frames: Vec<Frame>,
}

impl StackTrace {
    /// A trace with no frames.
    pub const fn empty() -> Self {
        StackTrace { frames: Vec::new() }
    }

    /// Record the current call stack.
    ///
    /// The first recorded frame is the caller of `capture`, moved outwards
    /// by `skip` frames. Library constructors pass `1` so the trace starts
    /// at their own caller.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let anchor = StackTrace::capture as fn(usize) -> StackTrace as usize;

        let mut ips = Vec::with_capacity(MAX_DEPTH);
        let mut start = None;
        backtrace::trace(|frame| {
            ips.push(frame.ip() as usize);
            if start.is_none() && frame.symbol_address() as usize == anchor {
                start = Some(ips.len() + skip);
            }
            match start {
                Some(start) => ips.len() < start + MAX_DEPTH,
                None => ips.len() < SCAN_LIMIT,
            }
        });

        let frames = ips
            .into_iter()
            .skip(start.unwrap_or(0))
            .take(MAX_DEPTH)
            .map(Frame)
            .collect();
        StackTrace { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
}

impl From<Vec<Frame>> for StackTrace {
    fn from(frames: Vec<Frame>) -> Self {
        StackTrace { frames }
    }
}

impl<'a> IntoIterator for &'a StackTrace {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl Render for StackTrace {
    fn render(&self, f: &mut fmt::Formatter<'_>, directive: Directive) -> fmt::Result {
        if directive.detailed {
            for frame in &self.frames {
                f.write_str("\n")?;
                frame.render(f, directive)?;
            }
            return Ok(());
        }

        f.write_str("[")?;
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            frame.render(f, directive)?;
        }
        f.write_str("]")
    }
}

/// `[a.rs:1, b.rs:2]`, or one `function\n\tpath:line` block per frame with `{:#}`.
impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detailed = f.alternate();
        self.render(f, Directive::new(Verb::Value, detailed))
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.frames).finish()
    }
}

/// Strip the module path from a demangled function name.
///
/// The segment before the last one is kept when it names a type (leading
/// uppercase letter, or a `<T as Trait>` qualifier), and closure segments
/// stay attached to their enclosing function.
pub(crate) fn funcname(name: &str) -> &str {
    let mut starts = vec![0];
    let mut depth = 0usize;
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' if depth > 0 => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                starts.push(i + 2);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let segments: Vec<&str> = starts
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = starts.get(k + 1).map_or(name.len(), |next| next - 2);
            &name[start..end]
        })
        .collect();

    let mut k = segments.len() - 1;
    while k > 0 && segments[k].starts_with("{{") {
        k -= 1;
    }
    if k > 0 {
        let owner = segments[k - 1];
        if owner.starts_with('<') || owner.starts_with(|c: char| c.is_ascii_uppercase()) {
            k -= 1;
        }
    }
    &name[starts[k]..]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Locator;

    impl Locator {
        #[inline(never)]
        fn here(&self) -> Frame {
            StackTrace::capture(0).frames()[0]
        }
    }

    fn render(value: &impl Render, directive: &str) -> String {
        value.to_string_as(directive.parse().unwrap())
    }

    #[test]
    fn test_unknown_frame() {
        assert_eq!(render(&Frame::UNKNOWN, "%s"), "unknown");
        assert_eq!(render(&Frame::UNKNOWN, "%+s"), "unknown\n\tunknown");
        assert_eq!(render(&Frame::UNKNOWN, "%d"), "0");
        assert_eq!(render(&Frame::UNKNOWN, "%n"), "unknown");
        assert_eq!(render(&Frame::UNKNOWN, "%v"), "unknown:0");
        assert_eq!(render(&Frame::UNKNOWN, "%q"), "\"unknown:0\"");
        assert_eq!(format!("{}", Frame::UNKNOWN), "unknown:0");
        assert_eq!(format!("{:#}", Frame::UNKNOWN), "unknown\n\tunknown:0");
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_capture_starts_at_caller() {
        let trace = StackTrace::capture(0);
        assert!(!trace.is_empty());
        assert!(trace.len() <= MAX_DEPTH);

        let frame = trace.frames()[0];
        assert!(frame.function().ends_with("tests::test_capture_starts_at_caller"));
        assert!(frame.file().ends_with("stack.rs"));
        assert!(frame.line() > 0);
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_frame_formats() {
        let frame = StackTrace::capture(0).frames()[0];
        let line = frame.line().to_string();

        assert_eq!(render(&frame, "%s"), "stack.rs");
        assert_eq!(render(&frame, "%d"), line);
        assert_eq!(render(&frame, "%n"), "test_frame_formats");
        assert_eq!(render(&frame, "%v"), format!("stack.rs:{}", line));

        let detailed = render(&frame, "%+v");
        let (function, location) = detailed.split_once("\n\t").unwrap();
        assert!(function.ends_with("tests::test_frame_formats"));
        assert!(location.ends_with(&format!("stack.rs:{}", line)));

        let detailed = render(&frame, "%+s");
        assert!(detailed.ends_with("stack.rs"));
        assert!(detailed.contains("\n\t"));
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_method_name_keeps_type() {
        assert_eq!(Locator.here().name(), "Locator::here");
    }

    #[test]
    fn test_funcname() {
        let cases = [
            ("", ""),
            ("main", "main"),
            ("skladka_error::stack::funcname", "funcname"),
            ("app::server::Router::handle", "Router::handle"),
            ("core::ops::function::FnOnce::call_once", "FnOnce::call_once"),
            ("app::tests::run::{{closure}}", "run::{{closure}}"),
            ("app::Store<T>::get", "Store<T>::get"),
            ("<app::Foo as core::fmt::Display>::fmt", "<app::Foo as core::fmt::Display>::fmt"),
        ];
        for (name, want) in cases {
            assert_eq!(funcname(name), want, "funcname({:?})", name);
        }
    }

    #[test]
    fn test_stack_trace_formats() {
        let empty = StackTrace::empty();
        assert_eq!(format!("{}", empty), "[]");
        assert_eq!(format!("{:#}", empty), "");
        assert_eq!(format!("{:?}", empty), "[]");

        let trace = StackTrace::from(vec![Frame::UNKNOWN, Frame::UNKNOWN]);
        assert_eq!(format!("{}", trace), "[unknown:0, unknown:0]");
        assert_eq!(render(&trace, "%s"), "[unknown, unknown]");
        assert_eq!(format!("{:?}", trace), "[unknown:0, unknown:0]");
        assert_eq!(
            format!("{:#}", trace),
            "\nunknown\n\tunknown:0\nunknown\n\tunknown:0"
        );
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "frame names need an unoptimized build")]
    fn test_detailed_trace_one_block_per_frame() {
        let trace = StackTrace::capture(0);
        let detailed = format!("{:#}", trace);
        assert!(detailed.starts_with('\n'));
        assert!(detailed.contains("tests::test_detailed_trace_one_block_per_frame\n\t"));
        assert_eq!(detailed.matches("\n\t").count(), trace.len());
    }
}
