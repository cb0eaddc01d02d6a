//! Application entry point.
//!
//! Parses command-line arguments, merges configuration layers, installs the
//! default locale and delegates execution to [`runner::run`].

use std::process::ExitCode;
use tracing::{Level, debug, error};
use tracing_subscriber::fmt;
use transmark::locale_resolution::{SysLocale, SystemEnv, resolve_startup_locale};
use transmark::{cli, locale, runner};

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let max_level = if parsed.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    let merged = match cli::merge_with_config(&parsed, &matches) {
        Ok(merged) => merged,
        Err(err) => {
            error!(error = %err, "configuration merge failed");
            return ExitCode::FAILURE;
        }
    };
    let startup = resolve_startup_locale(&merged, &SystemEnv, &SysLocale);
    debug!(locale = %startup, "default locale");
    if let Err(err) = locale::set_default(startup) {
        debug!(error = %err, "default locale already configured");
    }

    match runner::run(&merged) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "runner failed");
            ExitCode::FAILURE
        }
    }
}
