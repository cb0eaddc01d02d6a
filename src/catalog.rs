//! The merged message catalog and the seam for persisting it.
//!
//! A [`Catalog`] is produced by [`crate::extract`] already sorted by
//! `(domain, id)`. Persisting it is delegated to a [`CatalogWriter`]; the
//! bundled [`JsonCatalogWriter`] emits one pretty-printed JSON document per
//! domain so catalog diffs stay reviewable in version control.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::identity::MessageId;
use crate::record::{MessageRecord, is_valid_domain};

const CATALOG_EXTENSION: &str = "json";

/// Deduplicated, deterministically ordered set of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    messages: Vec<MessageRecord>,
}

impl Catalog {
    /// Build a catalog, sorting `messages` by `(domain, id)`.
    ///
    /// Callers are expected to pass records with unique identities; the
    /// extractor guarantees this.
    #[must_use]
    pub fn new(mut messages: Vec<MessageRecord>) -> Self {
        messages.sort_by(|a, b| (a.domain(), a.id()).cmp(&(b.domain(), b.id())));
        Self { messages }
    }

    /// Iterate over every message in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageRecord> {
        self.messages.iter()
    }

    /// Number of distinct messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Return `true` when the catalog holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Find the message with identity `id`.
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&MessageRecord> {
        self.messages.iter().find(|record| record.id() == id)
    }

    /// Distinct domains in sorted order.
    #[must_use]
    pub fn domains(&self) -> Vec<&str> {
        self.messages
            .iter()
            .map(MessageRecord::domain)
            .dedup()
            .collect()
    }

    /// Messages belonging to `domain`, in catalog order.
    pub fn domain<'cat>(&'cat self, domain: &'cat str) -> impl Iterator<Item = &'cat MessageRecord> {
        self.messages
            .iter()
            .filter(move |record| record.domain() == domain)
    }
}

impl<'cat> IntoIterator for &'cat Catalog {
    type Item = &'cat MessageRecord;
    type IntoIter = std::slice::Iter<'cat, MessageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Errors raised while persisting a catalog.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogWriteError {
    /// The destination directory could not be created or opened.
    #[error("cannot prepare catalog directory {path}: {source}")]
    #[diagnostic(code(transmark::catalog::destination))]
    Destination {
        /// Destination that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A domain cannot be used as a file name.
    #[error("domain '{domain}' cannot name a catalog file")]
    #[diagnostic(
        code(transmark::catalog::invalid_domain),
        help("domains must be a single file name without path separators")
    )]
    InvalidDomain {
        /// Offending domain.
        domain: String,
    },
    /// A stale catalog file could not be removed.
    #[error("cannot remove stale catalog file {path}: {source}")]
    #[diagnostic(code(transmark::catalog::stale))]
    Stale {
        /// File that could not be removed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A domain document could not be serialised.
    #[error("cannot serialise domain '{domain}': {source}")]
    #[diagnostic(code(transmark::catalog::serialise))]
    Serialise {
        /// Domain being written.
        domain: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A domain document could not be written.
    #[error("cannot write catalog file {path}: {source}")]
    #[diagnostic(code(transmark::catalog::write))]
    Write {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Persists a catalog beneath a destination directory.
pub trait CatalogWriter {
    /// Write `catalog` into `dest`, replacing output from earlier runs.
    ///
    /// Returns the paths written.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogWriteError`] when the destination cannot be prepared
    /// or a file cannot be written.
    fn write(
        &self,
        catalog: &Catalog,
        dest: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, CatalogWriteError>;
}

/// Writes `<domain>.json` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCatalogWriter;

#[derive(Serialize)]
struct DomainDocument<'cat> {
    domain: &'cat str,
    messages: Vec<&'cat MessageRecord>,
}

/// Shape of a document this writer produced, used to recognise stale output.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WrittenDocument {
    domain: String,
    messages: Vec<serde_json::Value>,
}

impl JsonCatalogWriter {
    fn open_destination(dest: &Utf8Path) -> Result<Dir, CatalogWriteError> {
        let destination = |source| CatalogWriteError::Destination {
            path: dest.to_owned(),
            source,
        };
        fs::create_dir_all(dest).map_err(destination)?;
        Dir::open_ambient_dir(dest, ambient_authority()).map_err(destination)
    }

    fn remove_stale(dir: &Dir, dest: &Utf8Path) -> Result<(), CatalogWriteError> {
        let entries = dir
            .entries()
            .map_err(|source| CatalogWriteError::Destination {
                path: dest.to_owned(),
                source,
            })?;
        for entry_result in entries {
            let entry = entry_result.map_err(|source| CatalogWriteError::Destination {
                path: dest.to_owned(),
                source,
            })?;
            let Ok(name) = entry.file_name() else {
                continue;
            };
            let is_file = entry.file_type().is_ok_and(|kind| kind.is_file());
            if !is_file || !Self::is_written_catalog(dir, &name) {
                continue;
            }
            dir.remove_file(&name)
                .map_err(|source| CatalogWriteError::Stale {
                    path: dest.join(&name),
                    source,
                })?;
            debug!(file = %dest.join(&name), "removed stale catalog file");
        }
        Ok(())
    }

    /// Return `true` when `name` holds a domain document written earlier.
    ///
    /// Other JSON files in the destination are left untouched.
    fn is_written_catalog(dir: &Dir, name: &str) -> bool {
        let path = Utf8Path::new(name);
        let (Some(CATALOG_EXTENSION), Some(stem)) = (path.extension(), path.file_stem()) else {
            return false;
        };
        dir.read_to_string(name)
            .ok()
            .and_then(|text| serde_json::from_str::<WrittenDocument>(&text).ok())
            .is_some_and(|document| {
                document.domain == stem && document.messages.iter().all(serde_json::Value::is_object)
            })
    }

    fn check_domains(catalog: &Catalog) -> Result<(), CatalogWriteError> {
        match catalog.domains().into_iter().find(|domain| !is_valid_domain(domain)) {
            Some(domain) => Err(CatalogWriteError::InvalidDomain {
                domain: domain.to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn render(catalog: &Catalog, domain: &str) -> Result<String, CatalogWriteError> {
        let document = DomainDocument {
            domain,
            messages: catalog.domain(domain).collect(),
        };
        let mut text = serde_json::to_string_pretty(&document).map_err(|source| {
            CatalogWriteError::Serialise {
                domain: domain.to_owned(),
                source,
            }
        })?;
        text.push('\n');
        Ok(text)
    }
}

impl CatalogWriter for JsonCatalogWriter {
    fn write(
        &self,
        catalog: &Catalog,
        dest: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, CatalogWriteError> {
        Self::check_domains(catalog)?;
        let dir = Self::open_destination(dest)?;
        Self::remove_stale(&dir, dest)?;
        let mut written = Vec::new();
        for domain in catalog.domains() {
            let file_name = format!("{domain}.{CATALOG_EXTENSION}");
            let text = Self::render(catalog, domain)?;
            dir.write(&file_name, text.as_bytes())
                .map_err(|source| CatalogWriteError::Write {
                    path: dest.join(&file_name),
                    source,
                })?;
            let path = dest.join(&file_name);
            info!(file = %path, "wrote catalog");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> Catalog {
        Catalog::new(vec![
            MessageRecord::new("Inbox").with_domain("mail"),
            MessageRecord::new("Open"),
            MessageRecord::new("Close"),
        ])
    }

    #[rstest]
    fn catalog_sorts_by_domain_then_id() {
        let catalog = sample();
        assert_eq!(catalog.domains(), ["default", "mail"]);
        let ids: Vec<_> = catalog.domain("default").map(MessageRecord::id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[rstest]
    fn get_finds_by_identity() {
        let catalog = sample();
        let id = MessageId::compute("Inbox", "mail", "");
        assert_eq!(catalog.get(&id).map(MessageRecord::text), Some("Inbox"));
    }

    fn temp_dest() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir");
        (dir, path)
    }

    #[rstest]
    fn foreign_json_files_survive_a_write() {
        let (_guard, dest) = temp_dest();
        fs::write(dest.join("package.json"), "{\"name\": \"site\"}\n").expect("package.json");
        fs::write(dest.join("mail.json"), "{\"domain\": \"other\", \"messages\": []}\n")
            .expect("mismatched domain");
        fs::write(dest.join("retired.json"), "{\"domain\": \"retired\", \"messages\": []}\n")
            .expect("stale catalog");
        let written = JsonCatalogWriter
            .write(&Catalog::new(vec![MessageRecord::new("Open")]), &dest)
            .expect("write");
        assert_eq!(written, [dest.join("default.json")]);
        assert!(dest.join("package.json").is_file());
        assert!(dest.join("mail.json").is_file());
        assert!(!dest.join("retired.json").exists());
    }

    #[rstest]
    #[case("ui/menu")]
    #[case("..")]
    #[case("a\\b")]
    fn domains_that_are_not_file_names_are_rejected(#[case] domain: &str) {
        let (_guard, dest) = temp_dest();
        fs::write(dest.join("retired.json"), "{\"domain\": \"retired\", \"messages\": []}\n")
            .expect("stale catalog");
        let catalog = Catalog::new(vec![
            MessageRecord::new("Open"),
            MessageRecord::new("Menu").with_domain(domain),
        ]);
        let err = JsonCatalogWriter.write(&catalog, &dest).expect_err("invalid domain");
        assert!(matches!(
            err,
            CatalogWriteError::InvalidDomain { domain: ref found } if found == domain
        ));
        assert!(dest.join("retired.json").is_file(), "nothing removed before validation");
    }

    #[rstest]
    fn rendered_document_ends_with_newline() {
        let text = JsonCatalogWriter::render(&sample(), "mail")
            .unwrap_or_else(|err| panic!("render: {err}"));
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"domain\": \"mail\""));
    }
}
