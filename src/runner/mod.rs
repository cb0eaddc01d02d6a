//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. `extract` scans the configured roots, writes
//! the catalog and then reports failures; `id` and `render` work on a single
//! message given on the command line.

mod error;
mod output;

pub use error::RunnerError;

use crate::catalog::{CatalogWriter, JsonCatalogWriter};
use crate::cli::{Cli, Commands, MessageArgs, RenderArgs, parse_variable, split_dependency};
use crate::extract::{Extraction, extract_all};
use crate::format::Variables;
use crate::locale::{self, Locale};
use crate::record::MessageRecord;
use crate::resolver::Resolver;
use crate::scan::{ScanOptions, ScanRoot, scan_roots};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info, warn};

/// Execute the parsed [`Cli`] command, writing results to standard output.
///
/// # Errors
///
/// Returns an error if scanning is incomplete, `--strict` rejects warnings,
/// the catalog cannot be written, or a message cannot be rendered.
pub fn run(cli: &Cli) -> Result<()> {
    let mut stdout = io::stdout().lock();
    run_with_output(cli, &mut stdout)
}

/// Execute the parsed [`Cli`] command, writing results to `out`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_output(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match cli.command.clone().unwrap_or(Commands::Extract) {
        Commands::Extract => handle_extract(cli, out),
        Commands::Id(args) => handle_id(&args, out),
        Commands::Render(args) => handle_render(cli, &args, out),
    }
}

/// Scan every root, write the catalog, then fail if anything went wrong.
///
/// The catalog is written even when units failed so that the messages that
/// were found are not lost.
fn handle_extract(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let base = base_dir(cli)?;
    let roots = scan_roots_for(cli, &base)?;
    let options = scan_options(cli)?;
    let extraction = extract_all(scan_roots(&roots, &options));
    report(&extraction);

    let dest = base.join(utf8(&cli.output)?);
    let written = JsonCatalogWriter
        .write(&extraction.catalog, &dest)
        .with_context(|| format!("writing catalog to {dest}"))?;
    info!(
        messages = extraction.catalog.len(),
        files = written.len(),
        "catalog written"
    );
    output::write_line(
        out,
        &format!(
            "{} message(s) in {} domain file(s) written to {dest}",
            extraction.catalog.len(),
            written.len()
        ),
    )
    .context("writing summary to stdout")?;

    if !extraction.is_complete() {
        return Err(RunnerError::IncompleteExtraction {
            failed: extraction.failures.len(),
        }
        .into());
    }
    if cli.strict && !extraction.warnings.is_empty() {
        return Err(RunnerError::StrictWarnings {
            count: extraction.warnings.len(),
        }
        .into());
    }
    Ok(())
}

fn report(extraction: &Extraction) {
    for warning in &extraction.warnings {
        warn!(id = %warning.id, domain = %warning.domain, "{warning}");
    }
    for failure in &extraction.failures {
        error!(unit = %failure.unit, file = %failure.file, "{failure}");
    }
}

fn handle_id(args: &MessageArgs, out: &mut impl Write) -> Result<()> {
    let record = record_for(args);
    output::write_line(out, record.id().as_str()).context("writing identity to stdout")
}

fn handle_render(cli: &Cli, args: &RenderArgs, out: &mut impl Write) -> Result<()> {
    let mut variables = Variables::new();
    for raw in &args.vars {
        let (name, value) = parse_variable(raw).map_err(|reason| RunnerError::InvalidVariable {
            value: raw.clone(),
            reason,
        })?;
        variables.insert(name, value);
    }
    let locale = match cli.locale.as_deref() {
        Some(raw) => Locale::parse(raw).map_err(|_| RunnerError::InvalidLocale {
            value: raw.to_owned(),
        })?,
        None => locale::current(),
    };
    let record = record_for(&args.message);
    let text = Resolver::installed()
        .resolve(&record, &variables, Some(&locale))
        .with_context(|| format!("rendering '{}' in {locale}", record.text()))?;
    output::write_line(out, &text).context("writing rendered text to stdout")
}

fn record_for(args: &MessageArgs) -> MessageRecord {
    MessageRecord::new(args.text.as_str())
        .with_domain(args.domain.as_str())
        .with_context(args.context.as_str())
}

fn utf8(path: &Path) -> Result<&Utf8Path, RunnerError> {
    Utf8Path::from_path(path).ok_or_else(|| RunnerError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

fn base_dir(cli: &Cli) -> Result<Utf8PathBuf, RunnerError> {
    match &cli.directory {
        Some(dir) => utf8(dir).map(Utf8Path::to_path_buf),
        None => Ok(Utf8PathBuf::from(".")),
    }
}

fn scan_roots_for(cli: &Cli, base: &Utf8Path) -> Result<Vec<ScanRoot>, RunnerError> {
    let mut roots = Vec::with_capacity(cli.root.len().max(1) + cli.dependency.len());
    if cli.root.is_empty() {
        roots.push(ScanRoot::from_path(base));
    }
    for root in &cli.root {
        roots.push(ScanRoot::from_path(base.join(utf8(root)?)));
    }
    for spec in &cli.dependency {
        let (name, path) = split_dependency(spec).ok_or_else(|| RunnerError::InvalidDependency {
            value: spec.clone(),
        })?;
        roots.push(ScanRoot::new(name, base.join(path)));
    }
    Ok(roots)
}

fn scan_options(cli: &Cli) -> Result<ScanOptions, RunnerError> {
    cli.exclude
        .iter()
        .try_fold(ScanOptions::default(), |options, raw| {
            Pattern::new(raw)
                .map(|pattern| options.with_exclude(pattern))
                .map_err(|source| RunnerError::InvalidExclude {
                    pattern: raw.clone(),
                    source,
                })
        })
}
