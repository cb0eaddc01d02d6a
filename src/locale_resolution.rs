//! Startup locale resolution for the command-line front end.
//!
//! Precedence is the merged `locale` setting (an explicit `--locale` flag or
//! a configuration file), then `TRANSMARK_LOCALE`, then the host's system
//! locale, and finally [`Locale::fallback`]. Invalid candidates are skipped
//! rather than reported so a malformed `LANG` never blocks the tool.

use crate::cli::Cli;
use crate::locale::Locale;

/// Environment variable name used to override the locale.
pub const TRANSMARK_LOCALE_ENV: &str = "TRANSMARK_LOCALE";

/// Read-only environment access used for locale resolution.
pub trait EnvProvider {
    /// Fetch the environment variable value for `key`.
    fn var(&self, key: &str) -> Option<String>;
}

/// Environment provider backed by the process environment.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// System locale provider for the current host.
pub trait SystemLocale {
    /// Return the system locale string when available.
    fn system_locale(&self) -> Option<String>;
}

/// System locale provider backed by `sys-locale`.
#[derive(Debug, Default, Copy, Clone)]
pub struct SysLocale;

impl SystemLocale for SysLocale {
    fn system_locale(&self) -> Option<String> {
        sys_locale::get_locale()
    }
}

fn select_locale<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<Locale> {
    candidates
        .into_iter()
        .flatten()
        .find_map(|raw| Locale::parse(raw).ok())
}

/// Resolve the process default locale from merged configuration.
///
/// # Examples
///
/// ```rust
/// use transmark::cli::Cli;
/// use transmark::locale_resolution::{EnvProvider, SystemLocale, resolve_startup_locale};
///
/// struct StubEnv(Option<String>);
/// impl EnvProvider for StubEnv {
///     fn var(&self, key: &str) -> Option<String> {
///         (key == "TRANSMARK_LOCALE").then(|| self.0.clone()).flatten()
///     }
/// }
///
/// struct StubSystem(Option<String>);
/// impl SystemLocale for StubSystem {
///     fn system_locale(&self) -> Option<String> {
///         self.0.clone()
///     }
/// }
///
/// let cli = Cli { locale: Some("it_IT".to_string()), ..Cli::default() };
/// let locale = resolve_startup_locale(
///     &cli,
///     &StubEnv(Some("fr".into())),
///     &StubSystem(Some("en_US.UTF-8".into())),
/// );
/// assert_eq!(locale.as_str(), "it-IT");
/// ```
#[must_use]
pub fn resolve_startup_locale(
    merged: &Cli,
    env: &impl EnvProvider,
    system: &impl SystemLocale,
) -> Locale {
    let env_locale = env.var(TRANSMARK_LOCALE_ENV);
    let system_locale = system.system_locale();
    select_locale([
        merged.locale.as_deref(),
        env_locale.as_deref(),
        system_locale.as_deref(),
    ])
    .unwrap_or_else(Locale::fallback)
}
