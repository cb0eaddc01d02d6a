//! Static discovery of marked messages.
//!
//! The scanner walks one or more source roots (the application and any
//! dependencies that mark messages), tokenizes every `.rs` file, and turns
//! each `t!`, `dt!`, `pt!`, or `dpt!` invocation into a [`MessageRecord`].
//! Every file is its own unit with its own [`Registry`]; a unit that cannot
//! be read or parsed yields a [`ScanUnitFailure`] and the walk continues.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use transmark::scan::scan_source;
//!
//! let export = scan_source("app", Utf8Path::new("src/lib.rs"), r#"
//!     // translators: shown on the landing page
//!     let greeting = t!("Hello {name}!", name = user);
//! "#)?;
//! let record = &export.records[0];
//! assert_eq!(record.text(), "Hello {name}!");
//! assert_eq!(record.comment(), Some("shown on the landing page"));
//! # Ok::<(), transmark::scan::ScanUnitFailure>(())
//! ```

mod invocation;
mod lexer;

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::record::{MessageRecord, Provenance};
use crate::registry::{Registry, UnitExport};
use invocation::{Invocation, find_invocations};
use lexer::{Token, TokenKind, tokenize};

const TRANSLATOR_PREFIX: &str = "translators:";
const SKIPPED_DIRS: &[&str] = &["target"];

/// A source tree to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    /// Crate-like name used as the first module path segment.
    pub name: String,
    /// Directory to walk.
    pub path: Utf8PathBuf,
}

impl ScanRoot {
    /// Describe a root with an explicit name.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into().replace('-', "_"),
            path: path.into(),
        }
    }

    /// Describe a root named after its directory.
    #[must_use]
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Self {
        let dir: Utf8PathBuf = path.into();
        let name = dir
            .canonicalize_utf8()
            .ok()
            .and_then(|resolved| resolved.file_name().map(str::to_owned))
            .unwrap_or_else(|| String::from("crate"));
        Self::new(name, dir)
    }
}

/// Options applied to every root.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Files whose root-relative path matches any pattern are skipped.
    pub exclude: Vec<Pattern>,
}

impl ScanOptions {
    /// Skip files matching `pattern`.
    #[must_use]
    pub fn with_exclude(mut self, pattern: Pattern) -> Self {
        self.exclude.push(pattern);
        self
    }

    fn is_excluded(&self, relative: &Utf8Path) -> bool {
        self.exclude
            .iter()
            .any(|pattern| pattern.matches_path(relative.as_std_path()))
    }
}

/// A unit that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("failed to scan {file}{}: {reason}", .line.map(|n| format!(":{n}")).unwrap_or_default())]
#[diagnostic(code(transmark::scan::unit_failure))]
pub struct ScanUnitFailure {
    /// Unit (module) the failure belongs to.
    pub unit: String,
    /// File that failed, relative to its root where possible.
    pub file: Utf8PathBuf,
    /// Line of the offending construct, when known.
    pub line: Option<u32>,
    /// Human-readable cause.
    pub reason: String,
}

/// Scan every root and return one result per unit.
///
/// Roots are walked in order, files in sorted order, so the result sequence
/// is deterministic; the extractor does not depend on it.
#[must_use]
pub fn scan_roots(
    roots: &[ScanRoot],
    options: &ScanOptions,
) -> Vec<Result<UnitExport, ScanUnitFailure>> {
    let mut results = Vec::new();
    for root in roots {
        debug!(root = %root.name, path = %root.path, "scanning root");
        let walker = WalkDir::new(&root.path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(should_visit_entry);
        for walk_entry in walker {
            match walk_entry {
                Ok(entry) => {
                    if let Some(result) = scan_entry(root, options, &entry) {
                        results.push(result);
                    }
                }
                Err(err) => results.push(Err(walk_failure(root, &err))),
            }
        }
    }
    results
}

fn should_visit_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
}

fn walk_failure(root: &ScanRoot, err: &walkdir::Error) -> ScanUnitFailure {
    let file = err
        .path()
        .and_then(Utf8Path::from_path)
        .map_or_else(|| root.path.clone(), Utf8Path::to_path_buf);
    ScanUnitFailure {
        unit: root.name.clone(),
        file,
        line: None,
        reason: err.to_string(),
    }
}

fn scan_entry(
    root: &ScanRoot,
    options: &ScanOptions,
    entry: &DirEntry,
) -> Option<Result<UnitExport, ScanUnitFailure>> {
    if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "rs") {
        return None;
    }
    let relative = match relative_utf8(root, entry) {
        Ok(path) => path,
        Err(failure) => return Some(Err(failure)),
    };
    if options.is_excluded(&relative) {
        debug!(file = %relative, "excluded from scan");
        return None;
    }
    let result = fs::read_to_string(entry.path())
        .map_err(|err| ScanUnitFailure {
            unit: module_name(&root.name, &relative),
            file: relative.clone(),
            line: None,
            reason: err.to_string(),
        })
        .and_then(|source| scan_source(&root.name, &relative, &source));
    Some(result)
}

fn relative_utf8(root: &ScanRoot, entry: &DirEntry) -> Result<Utf8PathBuf, ScanUnitFailure> {
    let relative = entry
        .path()
        .strip_prefix(root.path.as_std_path())
        .unwrap_or_else(|_| entry.path());
    Utf8Path::from_path(relative)
        .map(Utf8Path::to_path_buf)
        .ok_or_else(|| ScanUnitFailure {
            unit: root.name.clone(),
            file: Utf8PathBuf::from(relative.to_string_lossy().into_owned()),
            line: None,
            reason: String::from("path is not valid UTF-8"),
        })
}

/// Derive the module path that owns `relative` within the root `root_name`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use transmark::scan::module_name;
///
/// assert_eq!(module_name("app", Utf8Path::new("src/lib.rs")), "app");
/// assert_eq!(module_name("app", Utf8Path::new("src/ui/mod.rs")), "app::ui");
/// assert_eq!(module_name("app", Utf8Path::new("src/ui/menu.rs")), "app::ui::menu");
/// ```
#[must_use]
pub fn module_name(root_name: &str, relative: &Utf8Path) -> String {
    let stem = relative.with_extension("");
    let mut segments: Vec<&str> = stem.components().map(|c| c.as_str()).collect();
    if segments.first() == Some(&"src") {
        segments.remove(0);
    }
    if matches!(segments.last(), Some(&("lib" | "main" | "mod"))) {
        segments.pop();
    }
    let mut name = root_name.replace('-', "_");
    for segment in segments {
        name.push_str("::");
        name.push_str(&segment.replace('-', "_"));
    }
    name
}

/// Scan one file's source and export its registry.
///
/// # Errors
///
/// Returns [`ScanUnitFailure`] when the source cannot be tokenized or a
/// marking macro's arguments cannot be read statically.
pub fn scan_source(
    root_name: &str,
    relative: &Utf8Path,
    source: &str,
) -> Result<UnitExport, ScanUnitFailure> {
    let unit = module_name(root_name, relative);
    let normalized = source.replace("\r\n", "\n");
    let lines = LineIndex::new(&normalized);
    let fail = |offset: usize, reason: String| ScanUnitFailure {
        unit: unit.clone(),
        file: relative.to_owned(),
        line: Some(lines.line_of(offset)),
        reason,
    };
    let tokens = tokenize(&normalized).map_err(|err| fail(err.offset, err.to_string()))?;
    let invocations =
        find_invocations(&tokens).map_err(|err| fail(err.offset, err.reason))?;
    let comments = comment_lines(&tokens, &normalized, &lines);

    let mut registry = Registry::new(unit.clone());
    for invocation in invocations {
        let line = lines.line_of(invocation.offset);
        let comment = translator_comment(&comments, line);
        registry.register(build_record(invocation, comment, relative, line, &unit));
    }
    debug!(unit = %unit, messages = registry.len(), "scanned unit");
    Ok(registry.export())
}

fn build_record(
    invocation: Invocation,
    comment: Option<String>,
    relative: &Utf8Path,
    line: u32,
    unit: &str,
) -> MessageRecord {
    let mut record = MessageRecord::new(invocation.text);
    if let Some(domain) = invocation.domain {
        record = record.with_domain(domain);
    }
    if let Some(context) = invocation.context {
        record = record.with_context(context);
    }
    if let Some(text) = comment {
        record = record.with_comment(text);
    }
    for variable in invocation.variables {
        record = record.with_variable(variable);
    }
    record.with_provenance(Provenance::new(relative, line, unit))
}

/// Map each line holding only a `//` comment to the comment text.
///
/// Comments trailing code on the same line are ignored.
fn comment_lines(tokens: &[Token], source: &str, lines: &LineIndex) -> BTreeMap<u32, String> {
    tokens
        .iter()
        .filter_map(|token| match &token.kind {
            TokenKind::LineComment(text) if starts_line(source, token.offset) => {
                Some((lines.line_of(token.offset), text.clone()))
            }
            _ => None,
        })
        .collect()
}

fn starts_line(source: &str, offset: usize) -> bool {
    source
        .get(..offset)
        .and_then(|before| before.rsplit('\n').next())
        .is_some_and(|prefix| prefix.trim().is_empty())
}

/// Collect the contiguous comment block ending on the line above `line`
/// when its first line opens with `translators:`.
fn translator_comment(comments: &BTreeMap<u32, String>, line: u32) -> Option<String> {
    let mut block = Vec::new();
    let mut current = line.checked_sub(1)?;
    while let Some(text) = comments.get(&current) {
        block.push(text.trim());
        let Some(previous) = current.checked_sub(1) else {
            break;
        };
        current = previous;
    }
    block.reverse();
    let (first, rest) = block.split_first()?;
    let lowered = first.to_lowercase();
    if !lowered.starts_with(TRANSLATOR_PREFIX) {
        return None;
    }
    let opening = first.get(TRANSLATOR_PREFIX.len()..).unwrap_or_default().trim();
    let text = std::iter::once(opening)
        .chain(rest.iter().copied())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Byte offset to one-based line number lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> u32 {
        let line = match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        u32::try_from(line).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scan(source: &str) -> UnitExport {
        scan_source("app", Utf8Path::new("src/ui/menu.rs"), source)
            .unwrap_or_else(|err| panic!("scan failed: {err}"))
    }

    #[rstest]
    fn records_carry_provenance() {
        let export = scan("fn f() {\n    let _ = t!(\"Open\");\n}\n");
        assert_eq!(export.unit, "app::ui::menu");
        let record = export.records.first().unwrap_or_else(|| panic!("no record"));
        assert_eq!(
            record.provenance(),
            &[Provenance::new("src/ui/menu.rs", 2, "app::ui::menu")]
        );
    }

    #[rstest]
    fn translator_comments_span_contiguous_lines() {
        let source = "// unrelated\n\n// Translators: verb on the\n// file menu\nlet _ = pt!(\"verb\", \"Open\");\n";
        let export = scan(source);
        let record = export.records.first().unwrap_or_else(|| panic!("no record"));
        assert_eq!(record.comment(), Some("verb on the file menu"));
        assert_eq!(record.context(), "verb");
    }

    #[rstest]
    fn plain_comments_are_not_translator_comments() {
        let export = scan("// open the file\nlet _ = t!(\"Open\");\n");
        let record = export.records.first().unwrap_or_else(|| panic!("no record"));
        assert_eq!(record.comment(), None);
    }

    #[rstest]
    fn same_message_twice_in_one_unit_keeps_both_sites() {
        let export = scan("t!(\"Open\");\nt!(\"Open\");\n");
        assert_eq!(export.records.len(), 1);
        let lines: Vec<u32> = export
            .records
            .iter()
            .flat_map(|r| r.provenance().iter().map(|p| p.line))
            .collect();
        assert_eq!(lines, [1, 2]);
    }

    #[rstest]
    fn trailing_comments_are_not_translator_comments() {
        let export = scan("let x = f(); // translators: not for the next line\nlet _ = t!(\"Open\");\n");
        let record = export.records.first().unwrap_or_else(|| panic!("no record"));
        assert_eq!(record.comment(), None);
    }

    #[rstest]
    fn repeated_sites_in_one_file_keep_comment_and_variable_sets() {
        let source = "// translators: greeting on landing page\n\
                      let a = t!(\"Hello {name}!\", name = n);\n\
                      let b = t!(\"Hello {name}!\");\n";
        let export = scan(source);
        assert_eq!(export.records.len(), 2);
        let (catalog, warnings) = crate::extract::Extractor::new().merge([export]);
        let record = catalog.iter().next().unwrap_or_else(|| panic!("no record"));
        assert_eq!(record.comment(), Some("greeting on landing page"));
        assert_eq!(record.provenance().len(), 2);
        assert_eq!(warnings.len(), 1);
    }

    #[rstest]
    fn crlf_sources_match_runtime_literals() {
        let export = scan("t!(\"a \\\r\n   b\");\r\n");
        let record = export.records.first().unwrap_or_else(|| panic!("no record"));
        assert_eq!(record.text(), "a b");
    }

    #[rstest]
    fn failures_report_line_numbers() {
        let err = scan_source("app", Utf8Path::new("src/lib.rs"), "\n\nt!(name);\n")
            .err()
            .unwrap_or_else(|| panic!("expected failure"));
        assert_eq!(err.line, Some(3));
        assert_eq!(err.unit, "app");
        assert_eq!(
            err.to_string(),
            "failed to scan src/lib.rs:3: message text must be a string literal"
        );
    }

    #[rstest]
    #[case("src/lib.rs", "my_app")]
    #[case("src/main.rs", "my_app")]
    #[case("src/net/http-client.rs", "my_app::net::http_client")]
    #[case("tests/smoke.rs", "my_app::tests::smoke")]
    fn module_names_follow_file_layout(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(module_name("my-app", Utf8Path::new(path)), expected);
    }
}
