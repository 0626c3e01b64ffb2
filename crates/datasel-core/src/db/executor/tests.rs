use super::*;
use crate::{
    db::query::{
        compose::{BaseQuery, ColumnFragment, ReportQueryComposer},
        expr::{Expr, OuterRef},
        extract::extract,
        fragment::InnerQuery,
        plan::{OrderKey, OutputType},
        predicate::Predicate,
    },
    obs::sink::{MetricsSink, with_metrics_sink},
    plugin::{ColumnPlugin, PluginDescriptor},
    test_fixtures::{
        COMMENT, OWNER, RecentAuthors, default_param, recent_authors, schema, seeded_store,
    },
    value::ValueKind,
};
use std::cell::RefCell;

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

fn compose(base: BaseQuery, fragments: Vec<(PluginDescriptor, InnerQuery)>) -> ComposedQuery {
    ReportQueryComposer::new(&schema())
        .compose(
            base,
            fragments
                .into_iter()
                .map(|(plugin, inner)| ColumnFragment::new(plugin, inner))
                .collect(),
        )
        .expect("composes")
}

fn authors_query(kind: Option<i64>, count: u32) -> ComposedQuery {
    compose(
        BaseQuery::new(OWNER.type_id()).column("name"),
        vec![(
            RecentAuthors.descriptor(),
            recent_authors(&default_param(), kind, count),
        )],
    )
}

fn authors(rows: &ReportRows, owner: i64) -> Value {
    rows.value(&Value::Int(owner), "Recent Authors")
        .cloned()
        .expect("owner row")
}

#[test]
fn fragments_are_evaluated_per_outer_row() {
    let store = seeded_store();
    let rows = store.execute(&authors_query(None, 3)).expect("executes");

    assert_eq!(rows.columns, ["name", "Recent Authors"]);
    assert_eq!(rows.len(), 3);
    assert_eq!(authors(&rows, 1), Value::text_list(["Ben", "Ben", "Ann"]));
    assert_eq!(authors(&rows, 2), Value::text_list(["Ann"]));
    assert_eq!(rows.value(&Value::Int(1), "name"), Some(&Value::from("Pat")));
}

#[test]
fn empty_sequences_are_lists_never_null() {
    let store = seeded_store();
    let rows = store.execute(&authors_query(None, 3)).expect("executes");

    assert_eq!(authors(&rows, 3), Value::List(Vec::new()));
}

#[test]
fn take_zero_yields_empty_sequences() {
    let store = seeded_store();
    let rows = store.execute(&authors_query(None, 0)).expect("executes");

    for owner in [1, 2, 3] {
        assert_eq!(authors(&rows, owner), Value::List(Vec::new()));
    }
}

#[test]
fn equal_timestamps_break_ties_by_ascending_id() {
    let param = default_param();
    let inner = InnerQuery::scan(COMMENT.type_id(), param.clone())
        .filter(Predicate::eq("owner_id", Expr::Param(param)))
        .order_by(vec![OrderKey::desc("posted_at"), OrderKey::asc("id")])
        .project(Expr::field("id"))
        .take(3);
    let plugin = PluginDescriptor {
        output: OutputType::sequence_of(ValueKind::Int),
        ..RecentAuthors.descriptor()
    };

    let store = seeded_store();
    let rows = store
        .execute(&compose(BaseQuery::new(OWNER.type_id()), vec![(plugin, inner)]))
        .expect("executes");

    assert_eq!(
        authors(&rows, 1),
        Value::List(vec![Value::Int(105), Value::Int(102), Value::Int(101)])
    );
}

#[test]
fn unresolved_references_drop_rows_before_take() {
    // comment 105 is newest but its alias points at a missing author
    let store = seeded_store();
    let rows = store.execute(&authors_query(None, 1)).expect("executes");

    assert_eq!(authors(&rows, 1), Value::text_list(["Ben"]));
}

#[test]
fn classification_filter_excludes_other_kinds() {
    let store = seeded_store();
    let rows = store.execute(&authors_query(Some(2), 5)).expect("executes");

    assert_eq!(authors(&rows, 1), Value::text_list(["Cy"]));
    assert_eq!(authors(&rows, 2), Value::List(Vec::new()));
}

#[test]
fn scalar_columns_yield_first_value_or_null() {
    let plugin = PluginDescriptor {
        output: OutputType::scalar(ValueKind::Text),
        ..RecentAuthors.descriptor()
    };
    let query = compose(
        BaseQuery::new(OWNER.type_id()),
        vec![(plugin, recent_authors(&default_param(), None, 5).scalar())],
    );

    let rows = seeded_store().execute(&query).expect("executes");

    assert_eq!(authors(&rows, 1), Value::from("Ben"));
    assert_eq!(authors(&rows, 3), Value::Null);
}

#[test]
fn base_filter_and_order_shape_the_outer_rows() {
    let query = compose(
        BaseQuery::new(OWNER.type_id())
            .column("name")
            .filter(Predicate::ne("name", Expr::text("Sam")))
            .order_by(OrderKey::asc("name")),
        vec![(
            RecentAuthors.descriptor(),
            recent_authors(&default_param(), None, 1),
        )],
    );

    let rows = seeded_store().execute(&query).expect("executes");
    let keys: Vec<&Value> = rows.rows.iter().map(|row| &row.key).collect();

    assert_eq!(keys, [&Value::Int(3), &Value::Int(1)]);
}

#[test]
fn dotted_paths_read_through_one_reference() {
    let param = default_param();
    let inner = InnerQuery::scan(COMMENT.type_id(), param.clone())
        .filter(
            Predicate::eq("owner_id", Expr::Param(param))
                & Predicate::eq("alias_id.author_id", Expr::literal(3i64)),
        )
        .order_by(vec![OrderKey::asc("id")])
        .project(Expr::field("id"));
    let plugin = PluginDescriptor {
        output: OutputType::sequence_of(ValueKind::Int),
        ..RecentAuthors.descriptor()
    };

    let rows = seeded_store()
        .execute(&compose(BaseQuery::new(OWNER.type_id()), vec![(plugin, inner)]))
        .expect("executes");

    assert_eq!(
        authors(&rows, 1),
        Value::List(vec![Value::Int(102), Value::Int(103)])
    );
}

#[test]
fn take_stops_scanning_once_satisfied() {
    let param = default_param();
    let inner = InnerQuery::scan(COMMENT.type_id(), param.clone())
        .filter(Predicate::gte("owner_id", Expr::Param(param)))
        .project(Expr::field("body"))
        .take(1);
    let plugin = PluginDescriptor {
        column_name: "First Body",
        ..RecentAuthors.descriptor()
    };
    let query = compose(BaseQuery::new(OWNER.type_id()), vec![(plugin, inner)]);

    let sink = RecordingSink::default();
    let store = seeded_store();
    with_metrics_sink(&sink, || store.execute(&query)).expect("executes");

    let events = sink.events.borrow();
    let scanned = events.iter().find_map(|event| match event {
        MetricsEvent::RowsScanned { rows_scanned, .. } => Some(*rows_scanned),
        _ => None,
    });
    // 3 owners; owner 1 matches the first comment, owner 2 the fifth, owner 3 none
    assert_eq!(scanned, Some(3 + 1 + 5 + 7));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, MetricsEvent::ExecStart { .. }))
            .count(),
        1
    );
}

#[test]
fn missing_tables_surface_as_not_found() {
    let query = authors_query(None, 1);
    let mut store = MemoryStore::new();
    store.register(&OWNER).expect("registers owner");
    store
        .insert(OWNER.type_id(), [("id", Value::Int(1))])
        .expect("owner");

    let err = store.execute(&query).expect_err("comment table missing");

    assert!(err.is_not_found());
}

#[test]
fn outer_identity_is_read_from_the_outer_row() {
    let inner = InnerQuery::scan(COMMENT.type_id(), "outer")
        .filter(Predicate::eq("owner_id", Expr::param("outer")))
        .project(Expr::field("id"));
    let fragment = extract(inner, OuterRef::identity(&OWNER)).expect("closes");

    let store = seeded_store();
    let owner_table = store.table(OWNER.type_id()).expect("owners");
    let owner_row = owner_table
        .get(&Value::Int(2))
        .map(|row| BoundRow::new(&store, &OWNER, row))
        .expect("owner 2");

    let scanned = Cell::new(0);
    let value = run_fragment(&store, &fragment, &owner_row, &scanned).expect("runs");

    assert_eq!(value, Value::List(vec![Value::Int(104)]));
    assert_eq!(scanned.get(), 7);
}
