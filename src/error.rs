//! Errors raised by process-wide configuration.

use miette::Diagnostic;
use thiserror::Error;

use crate::locale::Locale;

/// A write-once process setting was configured twice.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigureError {
    /// [`crate::locale::set_default`] was already called.
    #[error("default locale already set to '{current}'")]
    #[diagnostic(code(transmark::configure::default_locale))]
    DefaultLocaleAlreadySet {
        /// Locale installed by the first call.
        current: Locale,
    },
    /// [`crate::backend::install_backend`] was already called.
    #[error("a translation backend is already installed")]
    #[diagnostic(
        code(transmark::configure::backend),
        help("wrap both backends in a LayeredBackend and install that once")
    )]
    BackendAlreadyInstalled,
    /// [`crate::format::install_formatter`] was already called.
    #[error("a formatter is already installed")]
    #[diagnostic(code(transmark::configure::formatter))]
    FormatterAlreadyInstalled,
}
