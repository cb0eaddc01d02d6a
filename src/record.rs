//! Catalog entries and their provenance.
//!
//! A [`MessageRecord`] carries everything a translator needs to know about
//! one logical message. The identity is recomputed whenever one of its inputs
//! changes, so a record can never disagree with its own [`MessageId`].

use camino::Utf8PathBuf;
use indexmap::IndexSet;
use serde::Serialize;

use crate::identity::MessageId;

/// Domain used when a message does not name one.
pub const DEFAULT_DOMAIN: &str = "default";

/// Return `true` when `domain` can name a catalog file.
///
/// A usable domain is non-empty, is not `.` or `..`, and contains no path
/// separators or control characters.
///
/// ```
/// use transmark::record::is_valid_domain;
///
/// assert!(is_valid_domain("mail"));
/// assert!(!is_valid_domain("ui/menu"));
/// ```
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain != "."
        && domain != ".."
        && !domain
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

/// Where a message was marked in the source tree.
///
/// Provenance is informational and never contributes to identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Provenance {
    /// Path of the source file relative to its scan root.
    pub file: Utf8PathBuf,
    /// One-based line of the marking macro.
    pub line: u32,
    /// Module that owns the call site, for example `my_app::ui::menu`.
    pub module: String,
}

impl Provenance {
    /// Describe a call site.
    #[must_use]
    pub fn new(file: impl Into<Utf8PathBuf>, line: u32, module: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            module: module.into(),
        }
    }
}

/// A single translatable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    id: MessageId,
    text: String,
    domain: String,
    context: String,
    comment: Option<String>,
    variables: IndexSet<String>,
    provenance: Vec<Provenance>,
}

impl MessageRecord {
    /// Create a record in the default domain with an empty context.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: MessageId::compute(&text, DEFAULT_DOMAIN, ""),
            text,
            domain: DEFAULT_DOMAIN.to_owned(),
            context: String::new(),
            comment: None,
            variables: IndexSet::new(),
            provenance: Vec::new(),
        }
    }

    /// Move the record into `domain`. An empty domain selects the default.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let requested = domain.into();
        self.domain = if requested.is_empty() {
            DEFAULT_DOMAIN.to_owned()
        } else {
            requested
        };
        self.refresh_id();
        self
    }

    /// Attach a disambiguating context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self.refresh_id();
        self
    }

    /// Attach a translator hint. Blank comments are dropped.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let value = comment.into();
        self.comment = (!value.trim().is_empty()).then_some(value);
        self
    }

    /// Declare a placeholder the template expects.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.variables.insert(name.into());
        self
    }

    /// Record a call site.
    #[must_use]
    pub fn with_provenance(mut self, site: Provenance) -> Self {
        self.add_provenance(site);
        self
    }

    /// Canonical identity of the message.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    /// Source-locale text, possibly containing placeholders.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Logical grouping key.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Disambiguating context; empty when unused.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Optional translator hint.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Declared placeholder names in declaration order.
    #[must_use]
    pub const fn variables(&self) -> &IndexSet<String> {
        &self.variables
    }

    /// Every known call site for this message.
    #[must_use]
    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }

    pub(crate) fn add_provenance(&mut self, site: Provenance) {
        if !self.provenance.contains(&site) {
            self.provenance.push(site);
        }
    }

    pub(crate) fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub(crate) fn set_variables(&mut self, variables: IndexSet<String>) {
        self.variables = variables;
    }

    pub(crate) fn set_provenance(&mut self, provenance: Vec<Provenance>) {
        self.provenance = provenance;
    }

    fn refresh_id(&mut self) {
        self.id = MessageId::compute(&self.text, &self.domain, &self.context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builder_keeps_identity_in_sync() {
        let record = MessageRecord::new("Open")
            .with_domain("files")
            .with_context("verb");
        assert_eq!(record.id(), &MessageId::compute("Open", "files", "verb"));
    }

    #[rstest]
    fn provenance_and_comment_do_not_change_identity() {
        let plain = MessageRecord::new("Save");
        let annotated = MessageRecord::new("Save")
            .with_comment("Toolbar button")
            .with_variable("file")
            .with_provenance(Provenance::new("src/ui.rs", 4, "app::ui"));
        assert_eq!(plain.id(), annotated.id());
    }

    #[rstest]
    fn empty_domain_selects_default() {
        let record = MessageRecord::new("Save").with_domain("");
        assert_eq!(record.domain(), DEFAULT_DOMAIN);
    }

    #[rstest]
    fn duplicate_provenance_is_ignored() {
        let site = Provenance::new("src/ui.rs", 4, "app::ui");
        let record = MessageRecord::new("Save")
            .with_provenance(site.clone())
            .with_provenance(site);
        assert_eq!(record.provenance().len(), 1);
    }

    #[rstest]
    fn blank_comment_is_dropped() {
        assert_eq!(MessageRecord::new("Save").with_comment("  ").comment(), None);
    }
}
