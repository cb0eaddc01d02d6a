//! Variable interpolation.
//!
//! The [`Formatter`] seam turns a template plus [`Variables`] into the final
//! string. [`BraceFormatter`] is the bundled implementation. Its grammar is
//! deliberately small:
//!
//! - `{name}` inserts the value as is (integers as digits, dates in ISO 8601);
//! - `{name, number}` groups integer digits with the locale's separator;
//! - `{name, date}` writes a date in the locale's numeric pattern;
//! - `{{` and `}}` produce literal braces.
//!
//! A placeholder with no matching variable is an error, never a blank.
//!
//! # Examples
//!
//! ```
//! use transmark::format::{BraceFormatter, Formatter, Variables};
//! use transmark::locale::Locale;
//!
//! let vars = Variables::new().with("count", 1_234_567_i64);
//! let de = Locale::parse("de-DE")?;
//! let text = BraceFormatter.render("{count, number} Dateien", &vars, &de)?;
//! assert_eq!(text, "1.234.567 Dateien");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

use crate::error::ConfigureError;
use crate::locale::Locale;

static FORMATTER: OnceLock<Arc<dyn Formatter>> = OnceLock::new();

/// A value substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free text.
    Text(String),
    /// A whole number.
    Integer(i64),
    /// A calendar date.
    Date(Date),
}

impl Value {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Date(_) => "date",
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

/// Named values in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(IndexMap<String, Value>);

impl Variables {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace `name` in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Rendering failures. None of them is ever replaced by a blank.
#[derive(Debug, Error, Diagnostic)]
pub enum FormatError {
    /// The template names a variable that was not supplied.
    #[error("missing value for placeholder '{name}'")]
    #[diagnostic(code(transmark::format::missing_variable))]
    MissingVariable {
        /// Placeholder name.
        name: String,
    },
    /// The style requires a different kind of value.
    #[error("placeholder '{name}' expects {expected} but got {found}")]
    #[diagnostic(code(transmark::format::type_mismatch))]
    TypeMismatch {
        /// Placeholder name.
        name: String,
        /// Kind the style requires.
        expected: &'static str,
        /// Kind that was supplied.
        found: &'static str,
    },
    /// The placeholder names a style other than `number` or `date`.
    #[error("placeholder '{name}' uses unknown style '{style}'")]
    #[diagnostic(
        code(transmark::format::unknown_style),
        help("supported styles are `number` and `date`")
    )]
    UnknownStyle {
        /// Placeholder name.
        name: String,
        /// Unrecognised style.
        style: String,
    },
    /// The template is malformed.
    #[error("invalid template at byte {offset}: {reason}")]
    #[diagnostic(code(transmark::format::syntax))]
    Syntax {
        /// Byte offset of the problem.
        offset: usize,
        /// What is wrong.
        reason: &'static str,
    },
    /// A date could not be written.
    #[error("cannot format date for placeholder '{name}': {source}")]
    #[diagnostic(code(transmark::format::date))]
    Date {
        /// Placeholder name.
        name: String,
        /// Underlying error from `time`.
        #[source]
        source: time::error::Format,
    },
}

/// Renders templates with variables.
#[cfg_attr(test, mockall::automock)]
pub trait Formatter: Send + Sync {
    /// Interpolate `variables` into `template` for `locale`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the template is malformed or a
    /// placeholder cannot be satisfied.
    fn render(
        &self,
        template: &str,
        variables: &Variables,
        locale: &Locale,
    ) -> Result<String, FormatError>;
}

/// Install the process-wide formatter.
///
/// # Errors
///
/// Returns [`ConfigureError::FormatterAlreadyInstalled`] after the first
/// successful call.
pub fn install_formatter(formatter: Arc<dyn Formatter>) -> Result<(), ConfigureError> {
    FORMATTER
        .set(formatter)
        .map_err(|_rejected| ConfigureError::FormatterAlreadyInstalled)
}

/// The installed formatter, if any.
#[must_use]
pub fn installed_formatter() -> Option<Arc<dyn Formatter>> {
    FORMATTER.get().cloned()
}

/// List placeholder names in order of first appearance.
///
/// # Errors
///
/// Returns [`FormatError`] when the template is malformed.
pub fn placeholders(template: &str) -> Result<Vec<&str>, FormatError> {
    let mut names: Vec<&str> = Vec::new();
    for segment in parse(template)? {
        if let Segment::Placeholder { name, .. } = segment
            && !names.contains(&name)
        {
            names.push(name);
        }
    }
    Ok(names)
}

/// The bundled `{name}` formatter.
#[derive(Debug, Default, Clone, Copy)]
pub struct BraceFormatter;

impl Formatter for BraceFormatter {
    fn render(
        &self,
        template: &str,
        variables: &Variables,
        locale: &Locale,
    ) -> Result<String, FormatError> {
        let mut out = String::with_capacity(template.len());
        for segment in parse(template)? {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Placeholder { name, style } => {
                    let value = variables
                        .get(name)
                        .ok_or_else(|| FormatError::MissingVariable {
                            name: name.to_owned(),
                        })?;
                    out.push_str(&render_value(name, style, value, locale)?);
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Plain,
    Number,
    Date,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'t> {
    Literal(String),
    Placeholder { name: &'t str, style: Style },
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, FormatError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '{' if chars.next_if(|&(_, next)| next == '{').is_some() => literal.push('{'),
            '}' if chars.next_if(|&(_, next)| next == '}').is_some() => literal.push('}'),
            '}' => {
                return Err(FormatError::Syntax {
                    offset,
                    reason: "unmatched `}`",
                });
            }
            '{' => {
                let mut close = None;
                for (idx, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            close = Some(idx);
                            break;
                        }
                        '{' => {
                            return Err(FormatError::Syntax {
                                offset: idx,
                                reason: "`{` inside a placeholder",
                            });
                        }
                        _ => {}
                    }
                }
                let Some(end) = close else {
                    return Err(FormatError::Syntax {
                        offset,
                        reason: "unclosed placeholder",
                    });
                };
                let body = template.get(offset + 1..end).unwrap_or_default();
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(parse_placeholder(body, offset)?);
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn parse_placeholder(body: &str, offset: usize) -> Result<Segment<'_>, FormatError> {
    let (raw_name, raw_style) = match body.split_once(',') {
        Some((name, style)) => (name.trim(), Some(style.trim())),
        None => (body.trim(), None),
    };
    if !is_identifier(raw_name) {
        return Err(FormatError::Syntax {
            offset,
            reason: "placeholder name must be an identifier",
        });
    }
    let style = match raw_style {
        None => Style::Plain,
        Some("number") => Style::Number,
        Some("date") => Style::Date,
        Some(other) => {
            return Err(FormatError::UnknownStyle {
                name: raw_name.to_owned(),
                style: other.to_owned(),
            });
        }
    };
    Ok(Segment::Placeholder {
        name: raw_name,
        style,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_alphanumeric())
}

fn render_value(
    name: &str,
    style: Style,
    value: &Value,
    locale: &Locale,
) -> Result<String, FormatError> {
    let mismatch = |expected| FormatError::TypeMismatch {
        name: name.to_owned(),
        expected,
        found: value.kind(),
    };
    let date_error = |source| FormatError::Date {
        name: name.to_owned(),
        source,
    };
    match (style, value) {
        (Style::Plain, Value::Text(text)) => Ok(text.clone()),
        (Style::Plain, Value::Integer(number)) => Ok(itoa::Buffer::new().format(*number).to_owned()),
        (Style::Plain, Value::Date(date)) => date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(date_error),
        (Style::Number, Value::Integer(number)) => Ok(group_digits(*number, group_separator(locale))),
        (Style::Number, _) => Err(mismatch("integer")),
        (Style::Date, Value::Date(date)) => format_date(*date, locale).map_err(date_error),
        (Style::Date, _) => Err(mismatch("date")),
    }
}

fn group_separator(locale: &Locale) -> &'static str {
    match (locale.language(), locale.region()) {
        ("de", Some("CH" | "LI")) => "\u{2019}",
        ("fr", _) => "\u{202f}",
        ("de" | "es" | "it" | "pt" | "nl" | "da" | "id" | "tr", _) => ".",
        _ => ",",
    }
}

fn group_digits(number: i64, separator: &str) -> String {
    let mut buffer = itoa::Buffer::new();
    let digits = buffer.format(number.unsigned_abs());
    let mut out = String::with_capacity(digits.len() * 2);
    if number < 0 {
        out.push('-');
    }
    let len = digits.len();
    for (idx, digit) in digits.chars().enumerate() {
        if idx > 0 && (len - idx).is_multiple_of(3) {
            out.push_str(separator);
        }
        out.push(digit);
    }
    out
}

fn format_date(date: Date, locale: &Locale) -> Result<String, time::error::Format> {
    match (locale.language(), locale.region()) {
        ("en", None | Some("US")) => date.format(format_description!("[month]/[day]/[year]")),
        ("de", _) => date.format(format_description!("[day].[month].[year]")),
        ("ja" | "zh" | "ko", _) => date.format(format_description!("[year]/[month]/[day]")),
        _ => date.format(format_description!("[day]/[month]/[year]")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    fn locale(tag: &str) -> Locale {
        Locale::parse(tag).unwrap_or_else(|err| panic!("{err}"))
    }

    fn render(template: &str, vars: &Variables, tag: &str) -> Result<String, FormatError> {
        BraceFormatter.render(template, vars, &locale(tag))
    }

    #[rstest]
    fn substitutes_named_text() {
        let vars = Variables::new().with("name", "Ana");
        assert_eq!(
            render("Hello {name}!", &vars, "en").expect("render"),
            "Hello Ana!"
        );
    }

    #[rstest]
    #[case("en", "1,234,567")]
    #[case("de-DE", "1.234.567")]
    #[case("it", "1.234.567")]
    #[case("fr-FR", "1\u{202f}234\u{202f}567")]
    #[case("de-CH", "1\u{2019}234\u{2019}567")]
    #[case("ja", "1,234,567")]
    fn number_style_groups_by_locale(#[case] tag: &str, #[case] expected: &str) {
        let vars = Variables::new().with("n", 1_234_567_i64);
        assert_eq!(render("{n, number}", &vars, tag).expect("render"), expected);
    }

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(-1_234, "-1,234")]
    #[case(i64::MIN, "-9,223,372,036,854,775,808")]
    fn grouping_edges(#[case] number: i64, #[case] expected: &str) {
        assert_eq!(group_digits(number, ","), expected);
    }

    #[rstest]
    #[case("en", "03/05/2024")]
    #[case("en-US", "03/05/2024")]
    #[case("en-GB", "05/03/2024")]
    #[case("de-AT", "05.03.2024")]
    #[case("ja-JP", "2024/03/05")]
    #[case("it", "05/03/2024")]
    fn date_style_follows_locale(#[case] tag: &str, #[case] expected: &str) {
        let vars = Variables::new().with("when", date!(2024 - 03 - 05));
        assert_eq!(render("{when, date}", &vars, tag).expect("render"), expected);
    }

    #[rstest]
    fn plain_values_are_unlocalized() {
        let vars = Variables::new()
            .with("n", 1234_i64)
            .with("when", date!(2024 - 03 - 05));
        assert_eq!(
            render("{n} {when}", &vars, "de").expect("render"),
            "1234 2024-03-05"
        );
    }

    #[rstest]
    fn doubled_braces_are_literal() {
        let vars = Variables::new().with("x", "y");
        assert_eq!(
            render("{{x}} = {x}", &vars, "en").expect("render"),
            "{x} = y"
        );
    }

    #[rstest]
    fn missing_variable_is_an_error() {
        let err = render("Hello {name}!", &Variables::new(), "en").expect_err("missing");
        assert!(matches!(err, FormatError::MissingVariable { ref name } if name == "name"));
    }

    #[rstest]
    fn number_style_rejects_text() {
        let vars = Variables::new().with("n", "many");
        let err = render("{n, number}", &vars, "en").expect_err("mismatch");
        assert!(matches!(
            err,
            FormatError::TypeMismatch {
                expected: "integer",
                found: "text",
                ..
            }
        ));
    }

    #[rstest]
    fn unknown_style_is_reported() {
        let vars = Variables::new().with("n", 1_i64);
        let err = render("{n, plural}", &vars, "en").expect_err("style");
        assert!(matches!(err, FormatError::UnknownStyle { ref style, .. } if style == "plural"));
    }

    #[rstest]
    #[case("Hello {name", 6)]
    #[case("oops }", 5)]
    #[case("{}", 0)]
    #[case("{a {b}}", 3)]
    fn malformed_templates(#[case] template: &str, #[case] at: usize) {
        let err = render(template, &Variables::new(), "en").expect_err("syntax");
        assert!(matches!(err, FormatError::Syntax { offset, .. } if offset == at));
    }

    #[rstest]
    fn placeholders_in_first_appearance_order() {
        let names = placeholders("{b} and {a, number} then {b}").expect("parse");
        assert_eq!(names, ["b", "a"]);
    }
}
