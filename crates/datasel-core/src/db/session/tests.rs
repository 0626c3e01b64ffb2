use super::*;
use crate::{
    db::executor::ReportRows,
    error::ErrorOrigin,
    obs::sink::MetricsEvent,
    report::ComputedColumnDef,
    test_fixtures::{OWNER, RecentAuthors, schema, seeded_store},
    value::Value,
};
use std::cell::{Cell, RefCell};

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new(&schema());
    registry.register(RecentAuthors).expect("registers");
    registry
}

fn owners_report(selections: &[&str]) -> ReportDefinition {
    selections.iter().fold(
        ReportDefinition::new(OWNER.type_id()).column("name"),
        |def, selection| def.computed(ComputedColumnDef::new(RecentAuthors::ID, *selection)),
    )
}

///
/// CountingBackend
///

struct CountingBackend<'a> {
    inner: &'a dyn QueryBackend,
    calls: Cell<usize>,
}

impl QueryBackend for CountingBackend<'_> {
    fn execute(&self, query: &ComposedQuery) -> Result<ReportRows, InternalError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.execute(query)
    }
}

struct CancellingBackend;

impl QueryBackend for CancellingBackend {
    fn execute(&self, _: &ComposedQuery) -> Result<ReportRows, InternalError> {
        Err(InternalError::cancelled(
            ErrorOrigin::Backend,
            "request aborted by client",
        ))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[test]
fn render_formats_computed_cells_with_the_plugin() {
    let store = seeded_store();
    let registry = registry();

    let output = ReportSession::new(&registry, &store)
        .render(&owners_report(&["|3"]))
        .expect("renders");

    assert_eq!(output.headers, ["name", "Recent Authors"]);
    assert_eq!(output.cell(&Value::Int(1), "name"), Some("Pat"));
    assert_eq!(
        output.cell(&Value::Int(1), "Recent Authors"),
        Some("Author 1: Ben, Author 2: Ben, Author 3: Ann")
    );
    assert_eq!(output.cell(&Value::Int(3), "Recent Authors"), Some(""));
    assert_eq!(output.fingerprint.len(), 64);
}

#[test]
fn header_overrides_replace_the_plugin_default() {
    let store = seeded_store();
    let registry = registry();
    let definition = ReportDefinition::new(OWNER.type_id()).computed(
        ComputedColumnDef::new(RecentAuthors::ID, "|1").with_header("Latest"),
    );

    let output = ReportSession::new(&registry, &store)
        .render(&definition)
        .expect("renders");

    assert_eq!(output.headers, ["Latest"]);
    assert_eq!(output.cell(&Value::Int(2), "Latest"), Some("Author 1: Ann"));
}

#[test]
fn many_columns_execute_in_one_roundtrip() {
    let store = seeded_store();
    let registry = registry();
    let backend = CountingBackend {
        inner: &store,
        calls: Cell::new(0),
    };

    let output = ReportSession::new(&registry, &backend)
        .debug()
        .render(&owners_report(&["|1", "2|5", ""]))
        .expect("renders");

    assert_eq!(backend.calls.get(), 1);
    assert_eq!(
        output.data.columns,
        ["name", "Recent Authors", "Recent Authors_2", "Recent Authors_3"]
    );
    assert_eq!(
        output.data.value(&Value::Int(1), "Recent Authors_2"),
        Some(&Value::text_list(["Cy"]))
    );
}

#[test]
fn repeated_headers_are_addressed_by_column_name() {
    let store = seeded_store();
    let registry = registry();

    let output = ReportSession::new(&registry, &store)
        .render(&owners_report(&["|1", "2|5"]))
        .expect("renders");

    assert_eq!(output.headers, ["name", "Recent Authors", "Recent Authors"]);
    assert_eq!(
        output.cell(&Value::Int(1), "Recent Authors"),
        Some("Author 1: Ben")
    );
    assert_eq!(
        output.column_cell(&Value::Int(1), "Recent Authors"),
        Some("Author 1: Ben")
    );
    assert_eq!(
        output.column_cell(&Value::Int(1), "Recent Authors_2"),
        Some("Author 1: Cy")
    );
    assert_eq!(output.column_cell(&Value::Int(1), "name"), Some("Pat"));
    assert_eq!(output.column_cell(&Value::Int(1), "missing"), None);
}

#[test]
fn prepare_composes_without_executing() {
    let registry = registry();
    let session = ReportSession::new(&registry, &CancellingBackend);

    let prepared = session
        .prepare(&owners_report(&["1|2", "1|2"]))
        .expect("prepares");

    assert_eq!(
        prepared.query().column_names(),
        ["name", "Recent Authors", "Recent Authors_2"]
    );
    assert_eq!(prepared.headers(), ["name", "Recent Authors", "Recent Authors"]);
}

#[test]
fn cancellation_propagates_unchanged() {
    let registry = registry();

    let err = ReportSession::new(&registry, &CancellingBackend)
        .render(&owners_report(&["|2"]))
        .expect_err("cancelled");

    assert!(err.is_cancelled());
    match err {
        ReportError::Backend(inner) => {
            assert_eq!(inner.origin, ErrorOrigin::Backend);
            assert_eq!(inner.message, "request aborted by client");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[test]
fn definition_errors_are_reported_before_execution() {
    let registry = registry();
    let session = ReportSession::new(&registry, &CancellingBackend);

    let unknown_entity = ReportDefinition {
        entity: "fixtures::Nowhere".to_string(),
        columns: Vec::new(),
        computed: Vec::new(),
    };
    assert!(matches!(
        session.render(&unknown_entity),
        Err(ReportError::UnknownEntity { entity }) if entity == "fixtures::Nowhere"
    ));

    let unknown_plugin = ReportDefinition::new(OWNER.type_id()).computed(ComputedColumnDef {
        plugin: "fixtures::Missing".to_string(),
        selection: String::new(),
        header: None,
    });
    assert!(matches!(
        session.render(&unknown_plugin),
        Err(ReportError::Registry(RegistryError::UnknownPlugin { .. }))
    ));

    assert!(matches!(
        session.render(&owners_report(&["1|-3"])),
        Err(ReportError::Config(_))
    ));

    let bad_column = owners_report(&[]).column("missing");
    let err = session.render(&bad_column).expect_err("unknown column");
    assert!(!err.is_cancelled());
    assert!(matches!(err, ReportError::Compose(_)));
}

#[test]
fn metrics_sink_sees_one_execution_per_render() {
    let store = seeded_store();
    let registry = registry();
    let sink: &'static RecordingSink = Box::leak(Box::default());

    ReportSession::new(&registry, &store)
        .metrics_sink(sink)
        .render(&owners_report(&["|1", "|2"]))
        .expect("renders");

    let events = sink.events.borrow();
    let execs = events
        .iter()
        .filter(|event| matches!(event, MetricsEvent::ExecStart { .. }))
        .count();
    let closed = events
        .iter()
        .filter(|event| matches!(event, MetricsEvent::FragmentClosed { .. }))
        .count();
    assert_eq!(execs, 1);
    assert_eq!(closed, 2);
    assert!(events.contains(&MetricsEvent::ExecFinish {
        entity_path: "fixtures::Owner",
        rows_returned: 3,
    }));
}
