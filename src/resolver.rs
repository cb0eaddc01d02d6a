//! Runtime resolution: lookup, fallback and rendering.
//!
//! [`Resolver::resolve`] picks the locale (explicit argument, else
//! [`crate::locale::current`]), asks the backend for a template, falls back
//! to the record's source text on a miss, and hands the result to the
//! formatter. Backend and formatter failures are returned, never swallowed.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::backend::{self, Backend, BackendError};
use crate::format::{self, BraceFormatter, FormatError, Formatter, Variables};
use crate::identity::MessageId;
use crate::locale::{self, Locale};
use crate::record::MessageRecord;

/// Errors returned by [`Resolver::resolve`].
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// The backend failed; a miss is not an error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),
    /// The template could not be rendered.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),
}

type TemplateCache = LruCache<CacheKey, Option<String>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    id: MessageId,
    locale: Locale,
}

/// Resolves messages against an optional backend.
#[derive(Clone)]
pub struct Resolver {
    backend: Option<Arc<dyn Backend>>,
    formatter: Arc<dyn Formatter>,
    cache: Option<Arc<Mutex<TemplateCache>>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("backend", &self.backend.is_some())
            .field("cache", &self.cache.as_ref().map(|cache| lock(cache).cap()))
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// A pass-through resolver using [`BraceFormatter`] and no backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: None,
            formatter: Arc::new(BraceFormatter),
            cache: None,
        }
    }

    /// A resolver built from the process-wide collaborators.
    ///
    /// Uses the backend from [`backend::install_backend`] and the formatter
    /// from [`format::install_formatter`] when they were installed.
    #[must_use]
    pub fn installed() -> Self {
        let mut resolver = Self::new();
        resolver.backend = backend::installed_backend();
        if let Some(formatter) = format::installed_formatter() {
            resolver.formatter = formatter;
        }
        resolver
    }

    /// Use `backend` for lookups.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use `formatter` for rendering.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Memoise up to `capacity` lookup results, misses included.
    ///
    /// Clones of the resolver share the cache.
    #[must_use]
    pub fn with_template_cache(mut self, capacity: NonZeroUsize) -> Self {
        self.cache = Some(Arc::new(Mutex::new(LruCache::new(capacity))));
        self
    }

    /// Drop every memoised lookup, for example after reloading translations.
    pub fn clear_template_cache(&self) {
        if let Some(cache) = &self.cache {
            lock(cache).clear();
        }
    }

    /// Return `true` when a backend is configured.
    #[must_use]
    pub const fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Render `record` in `locale`, or in the current locale when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Backend`] when the backend fails and
    /// [`ResolveError::Format`] when rendering fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use transmark::format::Variables;
    /// use transmark::locale::Locale;
    /// use transmark::record::MessageRecord;
    /// use transmark::resolver::Resolver;
    ///
    /// let record = MessageRecord::new("Hello {name}!");
    /// let vars = Variables::new().with("name", "Ana");
    /// let text = Resolver::new().resolve(&record, &vars, Some(&Locale::fallback()))?;
    /// assert_eq!(text, "Hello Ana!");
    /// # Ok::<(), transmark::resolver::ResolveError>(())
    /// ```
    pub fn resolve(
        &self,
        record: &MessageRecord,
        variables: &Variables,
        locale: Option<&Locale>,
    ) -> Result<String, ResolveError> {
        let active = locale.cloned().unwrap_or_else(locale::current);
        let template = match &self.backend {
            None => Cow::Borrowed(record.text()),
            Some(backend) => match self.lookup(backend.as_ref(), record, &active)? {
                Some(template) => Cow::Owned(template),
                None => {
                    debug!(id = %record.id(), locale = %active, "no translation; using source text");
                    Cow::Borrowed(record.text())
                }
            },
        };
        self.formatter
            .render(&template, variables, &active)
            .map_err(ResolveError::from)
    }

    fn lookup(
        &self,
        backend: &dyn Backend,
        record: &MessageRecord,
        locale: &Locale,
    ) -> Result<Option<String>, BackendError> {
        let Some(cache) = &self.cache else {
            return backend.lookup(record.id(), locale, record);
        };
        let key = CacheKey {
            id: record.id().clone(),
            locale: locale.clone(),
        };
        if let Some(cached) = lock(cache).get(&key).cloned() {
            debug!(id = %key.id, locale = %key.locale, "template cache hit");
            return Ok(cached);
        }
        let found = backend.lookup(record.id(), locale, record)?;
        lock(cache).put(key, found.clone());
        Ok(found)
    }
}

fn lock(cache: &Mutex<TemplateCache>) -> MutexGuard<'_, TemplateCache> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, TableBackend};
    use crate::format::MockFormatter;
    use rstest::{fixture, rstest};

    fn tag(raw: &str) -> Locale {
        Locale::parse(raw).unwrap_or_else(|err| panic!("{err}"))
    }

    #[fixture]
    fn greeting() -> MessageRecord {
        MessageRecord::new("Hello {name}!").with_variable("name")
    }

    #[fixture]
    fn ana() -> Variables {
        Variables::new().with("name", "Ana")
    }

    fn italian(record: &MessageRecord) -> Arc<dyn Backend> {
        Arc::new(TableBackend::new().with_template(
            tag("it"),
            record.id().clone(),
            "Ciao {name}!",
        ))
    }

    #[rstest]
    fn renders_source_text_without_backend(greeting: MessageRecord, ana: Variables) {
        let text = Resolver::new()
            .resolve(&greeting, &ana, Some(&tag("en")))
            .expect("resolve");
        assert_eq!(text, "Hello Ana!");
    }

    #[rstest]
    #[case("it", "Ciao Ana!")]
    #[case("it-IT", "Ciao Ana!")]
    #[case("fr", "Hello Ana!")]
    fn backend_templates_with_fallback(
        greeting: MessageRecord,
        ana: Variables,
        #[case] requested: &str,
        #[case] expected: &str,
    ) {
        let resolver = Resolver::new().with_backend(italian(&greeting));
        let text = resolver
            .resolve(&greeting, &ana, Some(&tag(requested)))
            .expect("resolve");
        assert_eq!(text, expected);
    }

    #[rstest]
    fn miss_matches_pass_through(greeting: MessageRecord, ana: Variables) {
        let mut backend = MockBackend::new();
        backend.expect_lookup().returning(|_, _, _| Ok(None));
        let with_miss = Resolver::new()
            .with_backend(Arc::new(backend))
            .resolve(&greeting, &ana, Some(&tag("de")))
            .expect("resolve");
        let plain = Resolver::new()
            .resolve(&greeting, &ana, Some(&tag("de")))
            .expect("resolve");
        assert_eq!(with_miss, plain);
    }

    #[rstest]
    fn missing_variable_is_not_blanked(greeting: MessageRecord) {
        let err = Resolver::new()
            .resolve(&greeting, &Variables::new(), Some(&tag("en")))
            .expect_err("missing variable");
        assert!(matches!(
            err,
            ResolveError::Format(FormatError::MissingVariable { .. })
        ));
    }

    #[rstest]
    fn backend_failure_propagates(greeting: MessageRecord, ana: Variables) {
        let mut backend = MockBackend::new();
        backend
            .expect_lookup()
            .returning(|_, _, _| Err(BackendError::new("catalog unreadable")));
        let err = Resolver::new()
            .with_backend(Arc::new(backend))
            .resolve(&greeting, &ana, Some(&tag("it")))
            .expect_err("backend failure");
        assert!(matches!(err, ResolveError::Backend(_)));
    }

    #[rstest]
    fn explicit_locale_reaches_formatter(greeting: MessageRecord, ana: Variables) {
        let mut formatter = MockFormatter::new();
        formatter
            .expect_render()
            .withf(|template, _, locale| template.starts_with("Hello") && locale.as_str() == "pt-BR")
            .times(1)
            .returning(|_, _, _| Ok("rendered".to_owned()));
        let text = Resolver::new()
            .with_formatter(Arc::new(formatter))
            .resolve(&greeting, &ana, Some(&tag("pt_BR")))
            .expect("resolve");
        assert_eq!(text, "rendered");
    }

    #[rstest]
    fn omitted_locale_uses_current(greeting: MessageRecord, ana: Variables) {
        let resolver = Resolver::new().with_backend(italian(&greeting));
        let text = locale::with_locale(tag("it"), || resolver.resolve(&greeting, &ana, None))
            .expect("resolve");
        assert_eq!(text, "Ciao Ana!");
    }

    #[rstest]
    fn cache_memoises_misses_until_cleared(greeting: MessageRecord, ana: Variables) {
        let mut backend = MockBackend::new();
        backend.expect_lookup().times(2).returning(|_, _, _| Ok(None));
        let capacity = NonZeroUsize::new(8).expect("non-zero");
        let resolver = Resolver::new()
            .with_backend(Arc::new(backend))
            .with_template_cache(capacity);
        let en = tag("en");
        for _ in 0..3 {
            resolver.resolve(&greeting, &ana, Some(&en)).expect("resolve");
        }
        resolver.clear_template_cache();
        resolver.resolve(&greeting, &ana, Some(&en)).expect("resolve");
    }
}
