//! Locale tags and the ambient locale context.
//!
//! The locale used for rendering is normally passed explicitly (see
//! [`crate::resolver::Resolver::resolve`]). Where threading it through is
//! impractical, code may consult [`current`], which returns, in order:
//!
//! 1. the innermost override installed on this thread by [`with_locale`] or
//!    [`override_locale`];
//! 2. the process default installed once with [`set_default`];
//! 3. [`Locale::fallback`] (`en`).
//!
//! Overrides are scoped to the thread that installed them. Threads spawned
//! inside a scope start without an override, and the [`LocaleGuard`] is
//! `!Send` so a scope cannot be closed from another thread.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::OnceLock;

use ortho_config::LanguageIdentifier;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::ConfigureError;

const FALLBACK_TAG: &str = "en";

static DEFAULT_LOCALE: OnceLock<Locale> = OnceLock::new();

thread_local! {
    static OVERRIDE: RefCell<Option<Locale>> = const { RefCell::new(None) };
}

/// Normalize a raw locale string into a valid BCP 47 language tag.
///
/// This strips encoding suffixes (for example `.UTF-8`), removes modifier
/// sections (for example `@latin`), replaces underscores with hyphens, and
/// validates the result using `LanguageIdentifier`.
///
/// # Examples
///
/// ```rust
/// use transmark::locale::normalize_locale_tag;
///
/// assert_eq!(normalize_locale_tag("en_US.UTF-8"), Some("en-US".to_string()));
/// assert_eq!(normalize_locale_tag("sr_RS@latin"), Some("sr-RS".to_string()));
/// assert_eq!(normalize_locale_tag(""), None);
/// ```
#[must_use]
pub fn normalize_locale_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.split(['.', '@']).next().unwrap_or_default().trim();
    if stripped.is_empty() {
        return None;
    }
    let candidate = stripped.replace('_', "-");
    LanguageIdentifier::from_str(&candidate)
        .ok()
        .map(|lang| lang.to_string())
}

/// A string that is not a usable locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid locale tag")]
pub struct ParseLocaleError {
    value: String,
}

/// A normalized BCP 47 language tag such as `en`, `it-IT` or `de-CH`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locale(String);

impl Locale {
    /// Parse and normalize `raw`.
    ///
    /// POSIX-style values such as `pt_BR.UTF-8` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ParseLocaleError`] when `raw` is not a valid tag.
    pub fn parse(raw: &str) -> Result<Self, ParseLocaleError> {
        normalize_locale_tag(raw)
            .map(Self)
            .ok_or_else(|| ParseLocaleError {
                value: raw.to_owned(),
            })
    }

    /// Locale used when nothing else is configured.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_TAG.to_owned())
    }

    /// Borrow the normalized tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag, for example `it` for `it-IT`.
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Region subtag, for example `CH` for `de-CH`.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.0.split('-').skip(1).find(|subtag| {
            let alpha = subtag.len() == 2 && subtag.bytes().all(|b| b.is_ascii_uppercase());
            let numeric = subtag.len() == 3 && subtag.bytes().all(|b| b.is_ascii_digit());
            alpha || numeric
        })
    }

    /// The bare-language locale this one falls back to, if it has subtags.
    #[must_use]
    pub fn language_only(&self) -> Option<Self> {
        (self.language() != self.0).then(|| Self(self.language().to_owned()))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Install the process default locale.
///
/// # Errors
///
/// Returns [`ConfigureError::DefaultLocaleAlreadySet`] on every call after
/// the first.
pub fn set_default(locale: Locale) -> Result<(), ConfigureError> {
    DEFAULT_LOCALE
        .set(locale)
        .map_err(|_rejected| ConfigureError::DefaultLocaleAlreadySet {
            current: DEFAULT_LOCALE.get().cloned().unwrap_or_else(Locale::fallback),
        })
}

/// The process default, if one was installed.
#[must_use]
pub fn default_locale() -> Option<Locale> {
    DEFAULT_LOCALE.get().cloned()
}

/// The locale in effect on this thread.
#[must_use]
pub fn current() -> Locale {
    OVERRIDE
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
        .or_else(default_locale)
        .unwrap_or_else(Locale::fallback)
}

/// Restores the previous thread override when dropped.
#[must_use = "the override ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LocaleGuard {
    previous: Option<Locale>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for LocaleGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Thread-local storage may already be gone during thread teardown.
        let _restored = OVERRIDE.try_with(|cell| cell.replace(previous));
    }
}

/// Override the locale on this thread until the guard drops.
pub fn override_locale(locale: Locale) -> LocaleGuard {
    let previous = OVERRIDE
        .try_with(|cell| cell.replace(Some(locale)))
        .ok()
        .flatten();
    LocaleGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Run `body` with `locale` as this thread's locale.
///
/// The previous locale is restored however `body` exits, including by panic.
///
/// # Examples
///
/// ```rust
/// use transmark::locale::{self, Locale, with_locale};
///
/// let before = locale::current();
/// let inside = with_locale(Locale::parse("it")?, locale::current);
/// assert_eq!(inside.as_str(), "it");
/// assert_eq!(locale::current(), before);
/// # Ok::<(), transmark::locale::ParseLocaleError>(())
/// ```
pub fn with_locale<R>(locale: Locale, body: impl FnOnce() -> R) -> R {
    let _guard = override_locale(locale);
    body()
}
