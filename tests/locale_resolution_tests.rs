//! Startup locale precedence with stubbed environment and host providers.

use anyhow::{Result, ensure};
use rstest::rstest;
use test_support::{StubEnv, StubSystemLocale};
use transmark::cli::Cli;
use transmark::locale_resolution::resolve_startup_locale;

fn cli_with(locale: Option<&str>) -> Cli {
    Cli {
        locale: locale.map(ToOwned::to_owned),
        ..Cli::default()
    }
}

#[rstest]
#[case(Some("es-ES"), Some("fr-FR"), Some("en_US"), "es-ES")]
#[case(None, Some("fr-FR"), Some("en_US"), "fr-FR")]
#[case(None, None, Some("es_ES.UTF-8"), "es-ES")]
#[case(None, None, None, "en")]
fn merged_setting_then_env_then_system(
    #[case] configured: Option<&str>,
    #[case] env: Option<&str>,
    #[case] system: Option<&str>,
    #[case] expected: &str,
) -> Result<()> {
    let env = StubEnv {
        locale: env.map(ToOwned::to_owned),
    };
    let system = StubSystemLocale {
        locale: system.map(ToOwned::to_owned),
    };
    let resolved = resolve_startup_locale(&cli_with(configured), &env, &system);
    ensure!(
        resolved.as_str() == expected,
        "expected {expected}, got {resolved}"
    );
    Ok(())
}

#[rstest]
fn invalid_candidates_are_skipped() -> Result<()> {
    let resolved = resolve_startup_locale(
        &cli_with(Some("bad locale")),
        &StubEnv::with_locale("C"),
        &StubSystemLocale::with_locale("pt_BR@latin"),
    );
    ensure!(resolved.as_str() == "pt-BR", "got {resolved}");
    Ok(())
}

#[rstest]
fn everything_invalid_falls_back_to_english() -> Result<()> {
    let resolved = resolve_startup_locale(
        &cli_with(None),
        &StubEnv::with_locale(""),
        &StubSystemLocale::with_locale("C.UTF-8"),
    );
    ensure!(resolved.as_str() == "en", "got {resolved}");
    Ok(())
}
