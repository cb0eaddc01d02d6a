//! Order-independent merge of per-unit exports into one catalog.
//!
//! Records are grouped by identity. Inside a group the contributions are put
//! into a canonical order before anything is chosen from them, so the catalog
//! does not depend on the order in which units were scanned or merged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::catalog::Catalog;
use crate::identity::MessageId;
use crate::record::{MessageRecord, Provenance};
use crate::registry::UnitExport;
use crate::scan::ScanUnitFailure;

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Merged catalog of every unit that scanned cleanly.
    pub catalog: Catalog,
    /// Non-fatal consistency problems, sorted by `(domain, id)`.
    pub warnings: Vec<VariableConsistencyWarning>,
    /// Units that were skipped, sorted by unit, file and line.
    pub failures: Vec<ScanUnitFailure>,
}

impl Extraction {
    /// Return `true` when every unit was merged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One distinct set of declared variables and the sites declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableVariant {
    /// Variable names, sorted.
    pub variables: Vec<String>,
    /// Call sites declaring exactly this set, sorted.
    pub sites: Vec<Provenance>,
}

impl fmt::Display for VariableVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.variables.iter().join(", "))?;
        if self.sites.is_empty() {
            return Ok(());
        }
        let sites = self
            .sites
            .iter()
            .map(|site| format!("{}:{}", site.file, site.line))
            .join(", ");
        write!(f, " at {sites}")
    }
}

/// The same message declares different variables at different sites.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error(
    "message \"{text}\" (domain '{domain}', id {id}) declares differing variables: {}",
    .variants.iter().join("; ")
)]
#[diagnostic(
    code(transmark::extract::variable_consistency),
    severity(Warning),
    help("declare the same named arguments at every call site of this message")
)]
pub struct VariableConsistencyWarning {
    /// Identity of the affected message.
    pub id: MessageId,
    /// Source text of the message.
    pub text: String,
    /// Domain of the message.
    pub domain: String,
    /// Context of the message.
    pub context: String,
    /// Every distinct variable set, ordered by the set.
    pub variants: Vec<VariableVariant>,
}

/// Merges unit exports into a [`Catalog`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor;

impl Extractor {
    /// Create an extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merge every successful unit and collect the failed ones.
    ///
    /// A failed unit is skipped; it never aborts the run.
    #[must_use]
    pub fn extract_all<I>(self, units: I) -> Extraction
    where
        I: IntoIterator<Item = Result<UnitExport, ScanUnitFailure>>,
    {
        let (exports, mut failures): (Vec<_>, Vec<_>) = units.into_iter().partition_result();
        failures.sort_by(|a, b| (&a.unit, &a.file, a.line).cmp(&(&b.unit, &b.file, b.line)));
        let (catalog, warnings) = self.merge(exports);
        debug!(
            messages = catalog.len(),
            warnings = warnings.len(),
            failures = failures.len(),
            "extraction finished"
        );
        Extraction {
            catalog,
            warnings,
            failures,
        }
    }

    /// Merge unit exports into a catalog plus any consistency warnings.
    #[must_use]
    pub fn merge<I>(self, exports: I) -> (Catalog, Vec<VariableConsistencyWarning>)
    where
        I: IntoIterator<Item = UnitExport>,
    {
        let mut groups: BTreeMap<MessageId, Vec<MessageRecord>> = BTreeMap::new();
        for export in exports {
            for record in export.records {
                groups.entry(record.id().clone()).or_default().push(record);
            }
        }

        let mut messages = Vec::with_capacity(groups.len());
        let mut warnings = Vec::new();
        for mut group in groups.into_values() {
            group.sort_by_cached_key(canonical_key);
            if let Some(warning) = consistency_warning(&group) {
                warnings.push(warning);
            }
            if let Some(record) = merge_group(group) {
                messages.push(record);
            }
        }
        warnings.sort_by(|a, b| (&a.domain, &a.id).cmp(&(&b.domain, &b.id)));
        (Catalog::new(messages), warnings)
    }
}

/// Merge `units` with a default [`Extractor`].
#[must_use]
pub fn extract_all<I>(units: I) -> Extraction
where
    I: IntoIterator<Item = Result<UnitExport, ScanUnitFailure>>,
{
    Extractor::new().extract_all(units)
}

type CanonicalKey = (Vec<Provenance>, Option<String>, Vec<String>, Vec<String>);

fn canonical_key(record: &MessageRecord) -> CanonicalKey {
    let sites = record.provenance().iter().cloned().sorted().collect();
    let declared: Vec<String> = record.variables().iter().cloned().collect();
    let sorted = declared.iter().cloned().sorted().collect();
    (sites, record.comment().map(str::to_owned), sorted, declared)
}

fn merge_group(group: Vec<MessageRecord>) -> Option<MessageRecord> {
    let comment = group
        .iter()
        .find_map(|record| record.comment().map(str::to_owned));
    let variables = group
        .iter()
        .map(MessageRecord::variables)
        .find(|declared| !declared.is_empty())
        .cloned()
        .unwrap_or_default();
    let provenance = group
        .iter()
        .flat_map(|record| record.provenance().iter().cloned())
        .sorted()
        .dedup()
        .collect();
    let mut merged = group.into_iter().next()?;
    merged.set_comment(comment);
    merged.set_variables(variables);
    merged.set_provenance(provenance);
    Some(merged)
}

fn consistency_warning(group: &[MessageRecord]) -> Option<VariableConsistencyWarning> {
    let mut variants: BTreeMap<Vec<String>, BTreeSet<Provenance>> = BTreeMap::new();
    for record in group {
        let key = record.variables().iter().cloned().sorted().collect();
        variants
            .entry(key)
            .or_default()
            .extend(record.provenance().iter().cloned());
    }
    if variants.len() < 2 {
        return None;
    }
    let first = group.first()?;
    Some(VariableConsistencyWarning {
        id: first.id().clone(),
        text: first.text().to_owned(),
        domain: first.domain().to_owned(),
        context: first.context().to_owned(),
        variants: variants
            .into_iter()
            .map(|(variables, sites)| VariableVariant {
                variables,
                sites: sites.into_iter().collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn export(unit: &str, records: Vec<MessageRecord>) -> UnitExport {
        UnitExport {
            unit: unit.to_owned(),
            records,
        }
    }

    fn greeting(file: &str, line: u32) -> MessageRecord {
        MessageRecord::new("Hello {name}!")
            .with_variable("name")
            .with_provenance(Provenance::new(file, line, "app"))
    }

    #[rstest]
    fn identical_messages_from_two_sites_merge() {
        let (catalog, warnings) = Extractor::new().merge([
            export("app::a", vec![greeting("src/a.rs", 3)]),
            export("app::b", vec![greeting("src/b.rs", 7)]),
        ]);
        assert!(warnings.is_empty());
        assert_eq!(catalog.len(), 1);
        let record = catalog.iter().next().expect("one record");
        assert_eq!(
            record.provenance(),
            &[
                Provenance::new("src/a.rs", 3, "app"),
                Provenance::new("src/b.rs", 7, "app"),
            ]
        );
    }

    #[rstest]
    fn merge_is_independent_of_unit_order() {
        let a = export(
            "app::a",
            vec![greeting("src/a.rs", 3).with_comment("from a")],
        );
        let b = export(
            "app::b",
            vec![greeting("src/b.rs", 1).with_comment("from b"), MessageRecord::new("Bye")],
        );
        let forward = Extractor::new().merge([a.clone(), b.clone()]);
        let backward = Extractor::new().merge([b, a]);
        assert_eq!(forward, backward);
    }

    #[rstest]
    fn first_comment_in_canonical_order_wins() {
        let (catalog, _) = Extractor::new().merge([
            export("app::b", vec![greeting("src/b.rs", 1).with_comment("from b")]),
            export("app::a", vec![greeting("src/a.rs", 9).with_comment("from a")]),
        ]);
        let record = catalog.iter().next().expect("one record");
        assert_eq!(record.comment(), Some("from a"));
    }

    #[rstest]
    fn differing_variables_produce_a_warning() {
        let bare = MessageRecord::new("Hello {name}!")
            .with_provenance(Provenance::new("src/c.rs", 2, "app::c"));
        let (catalog, warnings) = Extractor::new().merge([
            export("app::a", vec![greeting("src/a.rs", 3)]),
            export("app::c", vec![bare]),
        ]);
        assert_eq!(catalog.len(), 1);
        let warning = warnings.first().expect("one warning");
        let declared: Vec<_> = warning
            .variants
            .iter()
            .map(|variant| variant.variables.clone())
            .collect();
        assert_eq!(declared, [Vec::<String>::new(), vec!["name".to_owned()]]);
        assert!(warning.to_string().contains("src/c.rs:2"));
        let record = catalog.iter().next().expect("one record");
        assert!(record.variables().contains("name"));
    }

    #[rstest]
    fn failed_units_are_collected_not_fatal() {
        let failure = ScanUnitFailure {
            unit: "app::broken".to_owned(),
            file: "src/broken.rs".into(),
            line: Some(4),
            reason: "message text must be a string literal".to_owned(),
        };
        let extraction = extract_all([
            Err(failure.clone()),
            Ok(export("app::a", vec![greeting("src/a.rs", 3)])),
        ]);
        assert_eq!(extraction.catalog.len(), 1);
        assert_eq!(extraction.failures, [failure]);
        assert!(!extraction.is_complete());
    }

    #[rstest]
    fn catalog_is_sorted_by_domain_then_id() {
        let (catalog, _) = Extractor::new().merge([export(
            "app",
            vec![
                MessageRecord::new("Inbox").with_domain("mail"),
                MessageRecord::new("Zebra"),
                MessageRecord::new("Apple"),
            ],
        )]);
        let keys: Vec<_> = catalog
            .iter()
            .map(|record| (record.domain().to_owned(), record.id().clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
