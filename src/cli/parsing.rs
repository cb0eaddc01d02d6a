//! CLI parsing helpers for clap value parsers.

use glob::Pattern;
use time::Date;
use time::macros::format_description;

use crate::format::Value;
use crate::locale::Locale;

pub(super) fn parse_locale(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(String::from("locale must not be empty"));
    }
    Locale::parse(trimmed)
        .map(|locale| locale.to_string())
        .map_err(|err| err.to_string())
}

pub(super) fn parse_exclude(s: &str) -> Result<String, String> {
    Pattern::new(s)
        .map(|_| s.to_owned())
        .map_err(|err| format!("invalid exclude pattern '{s}': {err}"))
}

pub(super) fn parse_dependency(s: &str) -> Result<String, String> {
    split_dependency(s)
        .map(|(name, path)| format!("{name}={path}"))
        .ok_or_else(|| format!("dependency '{s}' must look like NAME=PATH"))
}

/// Split a `NAME=PATH` dependency specification.
///
/// Returns `None` when either side is empty or the name contains characters
/// other than ASCII letters, digits, `_` and `-`.
///
/// # Examples
///
/// ```rust
/// use transmark::cli::split_dependency;
///
/// assert_eq!(split_dependency("ui-kit=../ui-kit"), Some(("ui-kit", "../ui-kit")));
/// assert_eq!(split_dependency("=../ui-kit"), None);
/// ```
#[must_use]
pub fn split_dependency(s: &str) -> Option<(&str, &str)> {
    let (raw_name, raw_path) = s.split_once('=')?;
    let name = raw_name.trim();
    let path = raw_path.trim();
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    (valid_name && !path.is_empty()).then_some((name, path))
}

/// Parse a `NAME=VALUE` placeholder assignment.
///
/// Values that parse as `i64` become integers and `YYYY-MM-DD` values become
/// dates; anything else is text.
///
/// # Errors
///
/// Returns a message when `=` is missing or the name is not an identifier.
pub fn parse_variable(s: &str) -> Result<(String, Value), String> {
    let Some((raw_name, raw_value)) = s.split_once('=') else {
        return Err(format!("variable '{s}' must look like NAME=VALUE"));
    };
    let name = raw_name.trim();
    let mut chars = name.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|first| first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric());
    if !is_identifier {
        return Err(format!("variable name '{name}' is not an identifier"));
    }
    let value = if let Ok(number) = raw_value.parse::<i64>() {
        Value::Integer(number)
    } else if let Ok(date) = Date::parse(raw_value, format_description!("[year]-[month]-[day]")) {
        Value::Date(date)
    } else {
        Value::Text(raw_value.to_owned())
    };
    Ok((name.to_owned(), value))
}
