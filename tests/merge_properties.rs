//! Property tests for catalog merging and message identity.

use proptest::prelude::*;
use transmark::extract::Extractor;
use transmark::identity::MessageId;
use transmark::record::{MessageRecord, Provenance};
use transmark::registry::UnitExport;

const TEXTS: &[&str] = &["Open", "Save {name}", "{count, number} files"];
const DOMAINS: &[&str] = &["default", "mail"];
const CONTEXTS: &[&str] = &["", "verb"];
const COMMENTS: &[&str] = &["menu entry", "toolbar"];
const VARIABLES: &[&str] = &["name", "count"];
const FILES: &[&str] = &["src/a.rs", "src/b.rs", "src/c/mod.rs"];

fn record_strategy() -> impl Strategy<Value = MessageRecord> {
    (
        prop::sample::select(TEXTS),
        prop::sample::select(DOMAINS),
        prop::sample::select(CONTEXTS),
        prop::option::of(prop::sample::select(COMMENTS)),
        prop::sample::subsequence(VARIABLES, 0..=VARIABLES.len()),
        prop::sample::select(FILES),
        1_u32..40,
    )
        .prop_map(|(text, domain, context, comment, variables, file, line)| {
            let mut record = MessageRecord::new(text)
                .with_domain(domain)
                .with_context(context)
                .with_provenance(Provenance::new(file, line, "app"));
            if let Some(note) = comment {
                record = record.with_comment(note);
            }
            for name in variables {
                record = record.with_variable(name);
            }
            record
        })
}

fn split_into_units(records: Vec<MessageRecord>, per_unit: usize) -> Vec<UnitExport> {
    records
        .chunks(per_unit)
        .enumerate()
        .map(|(index, chunk)| UnitExport {
            unit: format!("app::unit{index}"),
            records: chunk.to_vec(),
        })
        .collect()
}

fn shuffled_pair() -> impl Strategy<Value = (Vec<MessageRecord>, Vec<MessageRecord>)> {
    prop::collection::vec(record_strategy(), 0..24).prop_flat_map(|records| {
        let original = records.clone();
        Just(records)
            .prop_shuffle()
            .prop_map(move |shuffled| (original.clone(), shuffled))
    })
}

proptest! {
    #[test]
    fn merge_ignores_unit_and_record_order(
        (original, shuffled) in shuffled_pair(),
        first_split in 1_usize..6,
        second_split in 1_usize..6,
    ) {
        let (catalog_a, warnings_a) = Extractor::new().merge(split_into_units(original, first_split));
        let (catalog_b, warnings_b) = Extractor::new().merge(split_into_units(shuffled, second_split));
        prop_assert_eq!(catalog_a, catalog_b);
        prop_assert_eq!(warnings_a, warnings_b);
    }

    #[test]
    fn merged_provenance_is_sorted_and_unique(records in prop::collection::vec(record_strategy(), 1..24)) {
        let (catalog, _) = Extractor::new().merge(split_into_units(records, 3));
        for message in &catalog {
            let sites = message.provenance();
            prop_assert!(sites.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
        }
    }

    #[test]
    fn identity_depends_only_on_its_three_fields(
        text in ".{0,24}",
        domain in "[a-z]{1,8}",
        context in ".{0,8}",
    ) {
        let id = MessageId::compute(&text, &domain, &context);
        prop_assert_eq!(&id, &MessageId::compute(&text, &domain, &context));
        prop_assert_eq!(id.as_str().len(), 64);
        prop_assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let record = MessageRecord::new(text.clone())
            .with_domain(domain.clone())
            .with_context(context.clone())
            .with_comment("ignored by identity")
            .with_variable("ignored");
        prop_assert_eq!(record.id(), &id);
    }

    #[test]
    fn moving_characters_between_fields_changes_identity(
        head in "[a-z]{1,6}",
        tail in "[a-z]{1,6}",
    ) {
        let joined = format!("{head}{tail}");
        prop_assert_ne!(
            MessageId::compute(&joined, "default", ""),
            MessageId::compute(&head, "default", &tail)
        );
    }
}
