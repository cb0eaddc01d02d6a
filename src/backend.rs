//! Translation lookup backends.
//!
//! A [`Backend`] maps `(identity, locale)` to a translated template. At most
//! one backend is installed per process, at startup, with
//! [`install_backend`]; running without one is the supported pass-through
//! mode in which every message renders its source text.
//!
//! A lookup has three outcomes: `Ok(Some(template))`, `Ok(None)` for a miss
//! (the resolver falls back to the source text) and `Err` for a genuine
//! failure such as an unreadable store, which is propagated.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};

use miette::Diagnostic;
use thiserror::Error;

use crate::error::ConfigureError;
use crate::identity::MessageId;
use crate::locale::Locale;
use crate::record::MessageRecord;

static BACKEND: OnceLock<Arc<dyn Backend>> = OnceLock::new();

/// A lookup that failed for a reason other than a missing translation.
#[derive(Debug, Error, Diagnostic)]
#[error("translation lookup failed: {message}")]
#[diagnostic(code(transmark::backend::lookup))]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl BackendError {
    /// Create an error with a description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Description supplied by the backend.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Looks up translated templates.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Find the template for `id` in `locale`.
    ///
    /// `record` carries the source text, domain and context for backends
    /// keyed on something other than the identity.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the store cannot be consulted. A
    /// missing translation is `Ok(None)`, not an error.
    fn lookup(
        &self,
        id: &MessageId,
        locale: &Locale,
        record: &MessageRecord,
    ) -> Result<Option<String>, BackendError>;
}

/// Install the process-wide backend.
///
/// # Errors
///
/// Returns [`ConfigureError::BackendAlreadyInstalled`] after the first
/// successful call; backends cannot be swapped at runtime.
pub fn install_backend(backend: Arc<dyn Backend>) -> Result<(), ConfigureError> {
    BACKEND
        .set(backend)
        .map_err(|_rejected| ConfigureError::BackendAlreadyInstalled)
}

/// The installed backend, if any.
#[must_use]
pub fn installed_backend() -> Option<Arc<dyn Backend>> {
    BACKEND.get().cloned()
}

/// In-memory templates keyed by locale tag and identity.
///
/// A lookup tries the exact tag first and then the bare language, so an
/// `it` entry serves `it-IT` and `it-CH`.
///
/// # Examples
///
/// ```
/// use transmark::backend::{Backend, TableBackend};
/// use transmark::locale::Locale;
/// use transmark::record::MessageRecord;
///
/// let record = MessageRecord::new("Hello {name}!");
/// let backend = TableBackend::new().with_template(
///     Locale::parse("it")?,
///     record.id().clone(),
///     "Ciao {name}!",
/// );
/// let found = backend.lookup(record.id(), &Locale::parse("it-IT")?, &record)?;
/// assert_eq!(found.as_deref(), Some("Ciao {name}!"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableBackend {
    templates: HashMap<(Locale, MessageId), String>,
}

impl TableBackend {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template.
    #[must_use]
    pub fn with_template(
        mut self,
        locale: Locale,
        id: MessageId,
        template: impl Into<String>,
    ) -> Self {
        self.insert(locale, id, template);
        self
    }

    /// Add or replace a template in place.
    pub fn insert(&mut self, locale: Locale, id: MessageId, template: impl Into<String>) {
        self.templates.insert((locale, id), template.into());
    }

    /// Number of stored templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Return `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn get(&self, locale: Locale, id: &MessageId) -> Option<&String> {
        self.templates.get(&(locale, id.clone()))
    }
}

impl Backend for TableBackend {
    fn lookup(
        &self,
        id: &MessageId,
        locale: &Locale,
        _record: &MessageRecord,
    ) -> Result<Option<String>, BackendError> {
        let exact = self.get(locale.clone(), id);
        let found = exact.or_else(|| {
            locale
                .language_only()
                .and_then(|language| self.get(language, id))
        });
        Ok(found.cloned())
    }
}

/// Consults `primary`, then `secondary` when the primary misses.
///
/// Errors from the primary are returned immediately.
pub struct LayeredBackend {
    primary: Arc<dyn Backend>,
    secondary: Arc<dyn Backend>,
}

impl LayeredBackend {
    /// Layer two backends.
    #[must_use]
    pub fn new(primary: Arc<dyn Backend>, secondary: Arc<dyn Backend>) -> Self {
        Self { primary, secondary }
    }
}

impl Backend for LayeredBackend {
    fn lookup(
        &self,
        id: &MessageId,
        locale: &Locale,
        record: &MessageRecord,
    ) -> Result<Option<String>, BackendError> {
        match self.primary.lookup(id, locale, record)? {
            Some(template) => Ok(Some(template)),
            None => self.secondary.lookup(id, locale, record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::always;
    use rstest::{fixture, rstest};

    fn locale(tag: &str) -> Locale {
        Locale::parse(tag).unwrap_or_else(|err| panic!("{err}"))
    }

    #[fixture]
    fn record() -> MessageRecord {
        MessageRecord::new("Open").with_context("verb")
    }

    #[fixture]
    fn table(record: MessageRecord) -> TableBackend {
        TableBackend::new()
            .with_template(locale("it"), record.id().clone(), "Apri")
            .with_template(locale("it-CH"), record.id().clone(), "Apri (CH)")
    }

    #[rstest]
    #[case("it-CH", Some("Apri (CH)"))]
    #[case("it-IT", Some("Apri"))]
    #[case("it", Some("Apri"))]
    #[case("fr", None)]
    fn table_prefers_exact_tag(
        table: TableBackend,
        record: MessageRecord,
        #[case] tag: &str,
        #[case] expected: Option<&str>,
    ) {
        let found = table
            .lookup(record.id(), &locale(tag), &record)
            .expect("lookup");
        assert_eq!(found.as_deref(), expected);
    }

    #[rstest]
    fn layered_falls_through_on_miss(table: TableBackend, record: MessageRecord) {
        let mut primary = MockBackend::new();
        primary
            .expect_lookup()
            .with(always(), always(), always())
            .times(1)
            .returning(|_, _, _| Ok(None));
        let layered = LayeredBackend::new(Arc::new(primary), Arc::new(table));
        let found = layered
            .lookup(record.id(), &locale("it"), &record)
            .expect("lookup");
        assert_eq!(found.as_deref(), Some("Apri"));
    }

    #[rstest]
    fn layered_stops_at_primary_error(table: TableBackend, record: MessageRecord) {
        let mut primary = MockBackend::new();
        primary
            .expect_lookup()
            .returning(|_, _, _| Err(BackendError::new("store offline")));
        let layered = LayeredBackend::new(Arc::new(primary), Arc::new(table));
        let err = layered
            .lookup(record.id(), &locale("it"), &record)
            .expect_err("primary error");
        assert_eq!(err.message(), "store offline");
    }
}
