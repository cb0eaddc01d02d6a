//! Backends with observable behaviour.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use transmark::backend::{Backend, BackendError, TableBackend};
use transmark::identity::MessageId;
use transmark::locale::Locale;
use transmark::record::MessageRecord;

/// Wraps a [`TableBackend`] and counts lookups.
#[derive(Debug, Default)]
pub struct CountingBackend {
    table: TableBackend,
    lookups: AtomicUsize,
}

impl CountingBackend {
    /// Count lookups answered by `table`.
    pub fn new(table: TableBackend) -> Arc<Self> {
        Arc::new(Self {
            table,
            lookups: AtomicUsize::new(0),
        })
    }

    /// Lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Backend for CountingBackend {
    fn lookup(
        &self,
        id: &MessageId,
        locale: &Locale,
        record: &MessageRecord,
    ) -> Result<Option<String>, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.table.lookup(id, locale, record)
    }
}

/// Fails every lookup.
#[derive(Debug, Clone)]
pub struct FailingBackend {
    message: String,
}

impl FailingBackend {
    /// Fail with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Backend for FailingBackend {
    fn lookup(
        &self,
        _id: &MessageId,
        _locale: &Locale,
        _record: &MessageRecord,
    ) -> Result<Option<String>, BackendError> {
        Err(BackendError::new(self.message.clone()))
    }
}
