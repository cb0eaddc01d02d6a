//! Per-unit message accumulation.
//!
//! One [`Registry`] collects the messages discovered in a single scanning
//! unit. Registration is keyed by [`MessageId`] plus the sorted set of
//! declared variables. Re-registering an entry unions its call sites and
//! keeps the latest non-empty comment, so a call site inside a loop never
//! grows the registry. Sites declaring different variables stay apart so
//! the extractor can report the inconsistency.

use indexmap::IndexMap;

use crate::identity::MessageId;
use crate::record::MessageRecord;

type EntryKey = (MessageId, Vec<String>);

/// Accumulator for the messages of one scanning unit.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    unit: String,
    entries: IndexMap<EntryKey, MessageRecord>,
}

impl Registry {
    /// Create an empty registry for `unit`.
    #[must_use]
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            entries: IndexMap::new(),
        }
    }

    /// Name of the unit this registry belongs to.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Add `record`, merging it with an earlier record of the same identity
    /// and variable set.
    pub fn register(&mut self, record: MessageRecord) {
        let key = entry_key(&record);
        match self.entries.get_mut(&key) {
            Some(existing) => {
                let mut sites = existing.provenance().to_vec();
                for site in record.provenance() {
                    if !sites.contains(site) {
                        sites.push(site.clone());
                    }
                }
                let comment = record
                    .comment()
                    .or_else(|| existing.comment())
                    .map(str::to_owned);
                let mut replacement = record;
                replacement.set_provenance(sites);
                replacement.set_comment(comment);
                *existing = replacement;
            }
            None => {
                self.entries.insert(key, record);
            }
        }
    }

    /// Number of entries registered so far.
    ///
    /// A message declared with differing variables counts once per set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the accumulated records in discovery order.
    #[must_use]
    pub fn export(&self) -> UnitExport {
        UnitExport {
            unit: self.unit.clone(),
            records: self.entries.values().cloned().collect(),
        }
    }
}

fn entry_key(record: &MessageRecord) -> EntryKey {
    let mut variables: Vec<String> = record.variables().iter().cloned().collect();
    variables.sort_unstable();
    (record.id().clone(), variables)
}

/// Records exported from one unit, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitExport {
    /// Unit the records came from.
    pub unit: String,
    /// Exported records.
    pub records: Vec<MessageRecord>,
}
