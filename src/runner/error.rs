//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. The unused_assignments lint fires in some
// Rust versions but not others. Since `#[expect]` fails when the lint doesn't
// fire, and `unfulfilled_lint_expectations` cannot be expected, we must use
// `#[allow]` here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// Some units could not be scanned. The catalog was still written.
    #[error("{failed} source file(s) could not be scanned; the catalog is incomplete")]
    #[diagnostic(
        code(transmark::runner::incomplete_extraction),
        help("fix the reported files or skip them with --exclude")
    )]
    IncompleteExtraction {
        /// Number of failed units.
        failed: usize,
    },
    /// Consistency warnings were found while `--strict` was set.
    #[error("{count} message(s) declare differing variables and --strict is set")]
    #[diagnostic(
        code(transmark::runner::strict_warnings),
        help("declare the same named arguments at every call site")
    )]
    StrictWarnings {
        /// Number of warnings.
        count: usize,
    },
    /// A `--var` assignment could not be parsed.
    #[error("invalid --var '{value}': {reason}")]
    #[diagnostic(code(transmark::runner::invalid_variable))]
    InvalidVariable {
        /// Raw assignment.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A configured dependency is not `NAME=PATH`.
    #[error("invalid dependency '{value}'; expected NAME=PATH")]
    #[diagnostic(code(transmark::runner::invalid_dependency))]
    InvalidDependency {
        /// Raw specification.
        value: String,
    },
    /// A configured exclude pattern is not a valid glob.
    #[error("invalid exclude pattern '{pattern}': {source}")]
    #[diagnostic(code(transmark::runner::invalid_exclude))]
    InvalidExclude {
        /// Raw pattern.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },
    /// A path could not be represented as UTF-8.
    #[error("path '{}' is not valid UTF-8", .path.display())]
    #[diagnostic(code(transmark::runner::non_utf8_path))]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
    /// The configured locale is not a valid tag.
    #[error("invalid locale '{value}'")]
    #[diagnostic(code(transmark::runner::invalid_locale))]
    InvalidLocale {
        /// Raw locale value.
        value: String,
    },
}
