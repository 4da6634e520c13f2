//! Rendering directives.
//!
//! Errors, stack traces and frames render under a [`Directive`]: a verb plus
//! a detail flag, written in the familiar `%s`, `%q`, `%v`, `%+v` notation.
//! `Display` covers the common cases (`{}` is `%v`, `{:#}` is `%+v`); the
//! [`Render`] trait reaches the rest.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::Error;

/// What to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `s`: the plain message. For frames, the source file name.
    Str,
    /// `q`: the plain message as a quoted, escaped string.
    Quoted,
    /// `v`: the default form. With detail, messages plus stack traces.
    Value,
    /// `d`: a frame's line number.
    Line,
    /// `n`: a frame's function name without its module path.
    Name,
}

impl Verb {
    pub fn as_char(&self) -> char {
        match self {
            Verb::Str => 's',
            Verb::Quoted => 'q',
            Verb::Value => 'v',
            Verb::Line => 'd',
            Verb::Name => 'n',
        }
    }

    pub fn from_char(c: char) -> Option<Verb> {
        match c {
            's' => Some(Verb::Str),
            'q' => Some(Verb::Quoted),
            'v' => Some(Verb::Value),
            'd' => Some(Verb::Line),
            'n' => Some(Verb::Name),
            _ => None,
        }
    }
}

/// A verb plus the detail flag (`+`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    pub verb: Verb,
    pub detailed: bool,
}

impl Directive {
    /// `%s`
    pub const STR: Directive = Directive::new(Verb::Str, false);
    /// `%q`
    pub const QUOTED: Directive = Directive::new(Verb::Quoted, false);
    /// `%v`
    pub const VALUE: Directive = Directive::new(Verb::Value, false);
    /// `%+v`
    pub const DETAILED: Directive = Directive::new(Verb::Value, true);

    pub const fn new(verb: Verb, detailed: bool) -> Self {
        Directive { verb, detailed }
    }
}

impl FromStr for Directive {
    type Err = Error;

    /// Parse `%v`, `%+v`, `%s`, `%+s`, `%q`, `%d` or `%n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix('%')
            .ok_or_else(|| crate::errorf!("directive {:?} must start with '%'", s))?;
        let (detailed, body) = match body.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, body),
        };

        let mut chars = body.chars();
        match (chars.next().and_then(Verb::from_char), chars.next()) {
            (Some(verb), None) => Ok(Directive::new(verb, detailed)),
            _ => Err(crate::errorf!("unsupported directive {:?}", s)),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        if self.detailed {
            f.write_str("+")?;
        }
        write!(f, "{}", self.verb.as_char())
    }
}

/// Values that render under a [`Directive`].
pub trait Render {
    fn render(&self, f: &mut fmt::Formatter<'_>, directive: Directive) -> fmt::Result;

    /// Adapt `self` into a `Display` value bound to `directive`.
    fn rendered(&self, directive: Directive) -> Rendered<'_, Self> {
        Rendered {
            value: self,
            directive,
        }
    }

    fn to_string_as(&self, directive: Directive) -> String {
        self.rendered(directive).to_string()
    }
}

/// A value paired with the directive it displays under.
pub struct Rendered<'a, T: ?Sized> {
    value: &'a T,
    directive: Directive,
}

impl<T: Render + ?Sized> fmt::Display for Rendered<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.render(f, self.directive)
    }
}

/// Write `s` as a double-quoted literal for `%q`.
///
/// Printable characters pass through. ASCII controls use the short escapes
/// (`\a`, `\n`, ...) or `\xNN`; other control characters use `\uNNNN`.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\x07' => f.write_str("\\a")?,
            '\x08' => f.write_str("\\b")?,
            '\x0c' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\x0b' => f.write_str("\\v")?,
            c if c.is_ascii_control() => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let cases = [
            ("%s", Directive::STR),
            ("%q", Directive::QUOTED),
            ("%v", Directive::VALUE),
            ("%+v", Directive::DETAILED),
            ("%+s", Directive::new(Verb::Str, true)),
            ("%d", Directive::new(Verb::Line, false)),
            ("%n", Directive::new(Verb::Name, false)),
        ];
        for (text, want) in cases {
            let got: Directive = text.parse().unwrap();
            assert_eq!(got, want, "parsing {:?}", text);
            assert_eq!(got.to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for text in ["", "v", "%", "%+", "%x", "%vv", "%#v"] {
            let err = text.parse::<Directive>().unwrap_err();
            assert!(err.to_string().contains("directive"), "{:?}: {}", text, err);
        }
    }

    struct Quoted(&'static str);

    impl fmt::Display for Quoted {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_quoted(f, self.0)
        }
    }

    #[test]
    fn test_write_quoted() {
        let cases = [
            ("error", r#""error""#),
            ("", r#""""#),
            ("say \"hi\"", r#""say \"hi\"""#),
            ("C:\\tmp", r#""C:\\tmp""#),
            ("a\x07b\x01", r#""a\ab\x01""#),
            ("line\nnext\ttab\r", r#""line\nnext\ttab\r""#),
            ("\x08\x0b\x0c\x7f", r#""\b\v\f\x7f""#),
            ("nel\u{85}", r#""nel\u0085""#),
            ("żółw ✓", r#""żółw ✓""#),
        ];
        for (input, want) in cases {
            assert_eq!(Quoted(input).to_string(), want, "quoting {:?}", input);
        }
    }

    #[test]
    fn test_verb_chars() {
        for verb in [Verb::Str, Verb::Quoted, Verb::Value, Verb::Line, Verb::Name] {
            assert_eq!(Verb::from_char(verb.as_char()), Some(verb));
        }
        assert_eq!(Verb::from_char('x'), None);
    }
}
