use chrono::{TimeZone, Utc};
use datasel::{
    ReportError,
    core::error::{ErrorOrigin, InternalError},
    people::{NoteSeed, PERSON, Seeder, note_type_options, register_plugins, schema},
    prelude::*,
};

fn store() -> MemoryStore {
    let at = |hour| {
        Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    };

    let mut seeder = Seeder::new().expect("schema");
    seeder
        .note_type(1, "General", 1, PERSON.path)
        .and_then(|s| s.person(1, "Pat", "Doe"))
        .and_then(|s| s.person(2, "Sam", "Roe"))
        .and_then(|s| s.person(10, "Al", "Smith"))
        .and_then(|s| s.person(11, "Bo", "Lee"))
        .and_then(|s| s.person(12, "Cy", "Kim"))
        .and_then(|s| s.note(NoteSeed::new(100, 1, 1, 10, at(9))))
        .and_then(|s| s.note(NoteSeed::new(101, 1, 1, 11, at(10))))
        .and_then(|s| s.note(NoteSeed::new(102, 1, 1, 10, at(11))))
        .and_then(|s| s.note(NoteSeed::new(103, 1, 1, 12, at(12)).private()))
        .expect("seed");

    seeder.into_store()
}

fn registry(store: &MemoryStore) -> PluginRegistry {
    let mut registry = PluginRegistry::new(&schema().expect("schema"));
    let options = note_type_options(store).expect("note types");
    register_plugins(&mut registry, &options).expect("plugins");

    registry
}

const PERSISTED: &str = r#"{
    "entity": "people::Person",
    "columns": ["nick_name", "last_name"],
    "computed": [
        { "plugin": "people::LastNoteAuthors", "selection": "1|2" },
        { "plugin": "people::LastPublicNoteDate", "selection": "", "header": "Last Note" }
    ]
}"#;

#[test]
fn persisted_definition_renders_in_one_roundtrip() {
    let store = store();
    let registry = registry(&store);
    let definition = ReportDefinition::from_json(PERSISTED).expect("definition");

    metrics_reset_all();
    let output = ReportSession::new(&registry, &store)
        .render(&definition)
        .expect("renders");

    assert_eq!(
        output.headers,
        ["nick_name", "last_name", "Last x Notes' Authors", "Last Note"]
    );
    assert_eq!(
        output.cell(&Value::Int(1), "Last x Notes' Authors"),
        Some("Note 1 Author: Al Smith, Note 2 Author: Bo Lee")
    );
    assert_eq!(output.cell(&Value::Int(1), "Last Note"), Some("2024-05-02"));
    assert_eq!(output.cell(&Value::Int(2), "Last x Notes' Authors"), Some(""));
    assert_eq!(output.cell(&Value::Int(2), "Last Note"), Some(""));

    let counters = metrics_report(None).counters.expect("counters");
    assert_eq!(counters.ops.compose_calls, 1);
    assert_eq!(counters.ops.fragments_closed, 2);
    assert_eq!(counters.ops.exec_calls, 1);
    assert_eq!(counters.ops.rows_returned, 5);
}

#[test]
fn definitions_persist_selections_verbatim() {
    let definition = ReportDefinition::from_json(PERSISTED).expect("definition");
    let json = definition.to_json().expect("serializes");

    assert_eq!(ReportDefinition::from_json(&json).expect("reparses"), definition);
    assert_eq!(definition.computed[0].selection, "1|2");
    assert!(!json.contains("\"header\":null"));
}

#[test]
fn composed_query_renders_as_correlated_sub_selects() {
    let store = store();
    let registry = registry(&store);
    let definition = ReportDefinition::from_json(PERSISTED).expect("definition");

    let prepared = ReportSession::new(&registry, &store)
        .prepare(&definition)
        .expect("prepares");
    let sql = prepared
        .query()
        .to_sql(registry.schema())
        .expect("renders sql");

    assert!(sql.starts_with("SELECT o.\"id\", o.\"nick_name\", o.\"last_name\", ARRAY(SELECT"));
    assert!(sql.contains("LIMIT 2) AS \"Last Notes' Authors\""));
    assert!(sql.contains("LIMIT 1) AS \"Last Public Note Date\""));
    assert!(sql.ends_with("FROM \"Person\" AS o"));
}

struct TimedOut;

impl QueryBackend for TimedOut {
    fn execute(&self, _: &ComposedQuery) -> Result<ReportRows, InternalError> {
        Err(InternalError::cancelled(
            ErrorOrigin::Backend,
            "statement timeout",
        ))
    }
}

#[test]
fn backend_cancellation_reaches_the_caller() {
    let store = store();
    let registry = registry(&store);
    let definition = ReportDefinition::from_json(PERSISTED).expect("definition");

    let err = ReportSession::new(&registry, &TimedOut)
        .render(&definition)
        .expect_err("cancelled");

    assert!(err.is_cancelled());
    assert!(matches!(err, ReportError::Backend(ref inner) if inner.message == "statement timeout"));
}
