//! Runtime resolution through explicitly configured resolvers.
//!
//! Nothing here touches the process-wide backend or formatter slots; see
//! `global_runtime_tests.rs` for those.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Result, ensure};
use rstest::{fixture, rstest};
use test_support::{CountingBackend, FailingBackend, locale};
use transmark::backend::{LayeredBackend, TableBackend};
use transmark::format::Variables;
use transmark::locale::with_locale;
use transmark::record::MessageRecord;
use transmark::{Message, ResolveError, Resolver};

#[fixture]
fn greeting() -> MessageRecord {
    MessageRecord::new("Hello {name}!").with_variable("name")
}

#[fixture]
fn files() -> MessageRecord {
    MessageRecord::new("{count, number} files on {when, date}")
        .with_variable("count")
        .with_variable("when")
}

fn italian(record: &MessageRecord) -> TableBackend {
    TableBackend::new().with_template(locale("it"), record.id().clone(), "Ciao {name}!")
}

#[rstest]
fn installed_template_is_used_for_its_locale(greeting: MessageRecord) -> Result<()> {
    let resolver = Resolver::new().with_backend(Arc::new(italian(&greeting)));
    let text = Message::new(greeting)
        .with_arg("name", "Ana")
        .render_with(&resolver, Some(&locale("it")))?;
    ensure!(text == "Ciao Ana!", "got {text}");
    Ok(())
}

#[rstest]
#[case("en-US", "12,345 files on 03/05/2024")]
#[case("de-DE", "12.345 files on 05.03.2024")]
#[case("fr-FR", "12\u{202f}345 files on 05/03/2024")]
#[case("ja", "12,345 files on 2024/03/05")]
fn locale_shapes_numbers_and_dates(
    files: MessageRecord,
    #[case] tag: &str,
    #[case] expected: &str,
) -> Result<()> {
    let when = time::macros::date!(2024 - 03 - 05);
    let vars = Variables::new().with("count", 12_345_i64).with("when", when);
    let text = Resolver::new().resolve(&files, &vars, Some(&locale(tag)))?;
    ensure!(text == expected, "{tag}: got {text}");
    Ok(())
}

#[rstest]
fn missing_translation_falls_back_to_source(greeting: MessageRecord) -> Result<()> {
    let resolver = Resolver::new().with_backend(Arc::new(italian(&greeting)));
    let vars = Variables::new().with("name", "Ana");
    let text = with_locale(locale("pt-BR"), || resolver.resolve(&greeting, &vars, None))?;
    ensure!(text == "Hello Ana!", "got {text}");
    Ok(())
}

#[rstest]
fn missing_variable_is_an_error_not_a_partial_string(greeting: MessageRecord) -> Result<()> {
    let result = Resolver::new().resolve(&greeting, &Variables::new(), Some(&locale("en")));
    ensure!(
        matches!(result, Err(ResolveError::Format(_))),
        "unexpected result: {result:?}"
    );
    Ok(())
}

#[rstest]
fn backend_failure_is_surfaced(greeting: MessageRecord) -> Result<()> {
    let resolver = Resolver::new().with_backend(Arc::new(FailingBackend::new("catalog offline")));
    let vars = Variables::new().with("name", "Ana");
    let err = resolver
        .resolve(&greeting, &vars, Some(&locale("it")))
        .expect_err("backend failure must propagate");
    ensure!(matches!(err, ResolveError::Backend(_)), "unexpected error: {err:?}");
    ensure!(err.to_string().contains("catalog offline"), "message: {err}");
    Ok(())
}

#[rstest]
fn layered_backend_prefers_the_primary(greeting: MessageRecord) -> Result<()> {
    let primary = TableBackend::new().with_template(
        locale("it-CH"),
        greeting.id().clone(),
        "Salve {name}!",
    );
    let resolver = Resolver::new().with_backend(Arc::new(LayeredBackend::new(
        Arc::new(primary),
        Arc::new(italian(&greeting)),
    )));
    let vars = Variables::new().with("name", "Ana");
    let swiss = resolver.resolve(&greeting, &vars, Some(&locale("it-CH")))?;
    let plain = resolver.resolve(&greeting, &vars, Some(&locale("it")))?;
    ensure!(swiss == "Salve Ana!", "it-CH: got {swiss}");
    ensure!(plain == "Ciao Ana!", "it: got {plain}");
    Ok(())
}

#[rstest]
fn template_cache_skips_repeated_lookups(greeting: MessageRecord) -> Result<()> {
    let backend = CountingBackend::new(italian(&greeting));
    let capacity = NonZeroUsize::new(8).expect("non-zero capacity");
    let resolver = Resolver::new()
        .with_backend(backend.clone())
        .with_template_cache(capacity);
    let vars = Variables::new().with("name", "Ana");
    for _ in 0..3 {
        resolver.resolve(&greeting, &vars, Some(&locale("it")))?;
        resolver.resolve(&greeting, &vars, Some(&locale("fr")))?;
    }
    ensure!(backend.lookups() == 2, "lookups: {}", backend.lookups());

    resolver.clear_template_cache();
    resolver.resolve(&greeting, &vars, Some(&locale("it")))?;
    ensure!(backend.lookups() == 3, "lookups after clear: {}", backend.lookups());
    Ok(())
}
