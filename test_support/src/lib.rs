//! Test utilities shared by the integration suites.
//!
//! Provides stub locale providers, a builder for throwaway source trees and
//! backends with observable behaviour.

pub mod backends;
pub mod locale_stubs;
pub mod project;

pub use backends::{CountingBackend, FailingBackend};
pub use locale_stubs::{StubEnv, StubSystemLocale};
pub use project::FixtureProject;

use transmark::locale::Locale;

/// Parse `tag` as a [`Locale`].
///
/// # Panics
///
/// Panics when `tag` is not a valid locale.
pub fn locale(tag: &str) -> Locale {
    Locale::parse(tag).unwrap_or_else(|err| panic!("invalid locale '{tag}': {err}"))
}
