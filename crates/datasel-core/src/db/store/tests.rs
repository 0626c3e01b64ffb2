use super::*;
use crate::{
    error::{ErrorClass, ErrorOrigin},
    test_fixtures::{AUTHOR, AUTHOR_ALIAS, COMMENT, OWNER, at, schema, seeded_store},
};

fn owners() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.register(&OWNER).expect("owner table");
    store
}

fn assert_store_invariant(err: &InternalError, needle: &str) {
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(err.origin, ErrorOrigin::Store);
    assert!(
        err.message.contains(needle),
        "expected '{needle}' in '{}'",
        err.message
    );
}

#[test]
fn insert_then_get_by_primary_key() {
    let mut store = owners();
    store
        .insert(OWNER.type_id(), [("id", Value::Int(7)), ("name", Value::from("Kit"))])
        .expect("insert");

    let row = store.get(OWNER.type_id(), &Value::Int(7)).expect("row");
    assert_eq!(row.values(), [Value::Int(7), Value::from("Kit")]);
    assert_eq!(store.len(OWNER.type_id()), 1);
}

#[test]
fn omitted_fields_are_null() {
    let mut store = owners();
    store
        .insert(OWNER.type_id(), [("id", Value::Int(1))])
        .expect("insert");

    let row = store.get(OWNER.type_id(), &Value::Int(1)).expect("row");
    assert_eq!(row.get(1), Some(&Value::Null));
}

#[test]
fn unsigned_keys_normalize_to_the_field_kind() {
    let mut store = owners();
    store
        .insert(OWNER.type_id(), [("id", Value::Uint(4))])
        .expect("insert");

    assert!(store.get(OWNER.type_id(), &Value::Int(4)).is_some());
}

#[test]
fn duplicate_and_missing_keys_are_rejected() {
    let mut store = owners();
    store
        .insert(OWNER.type_id(), [("id", Value::Int(1))])
        .expect("first insert");

    let dup = store
        .insert(OWNER.type_id(), [("id", Value::Int(1))])
        .expect_err("duplicate");
    assert_store_invariant(&dup, "duplicate primary key 1");

    let missing = store
        .insert(OWNER.type_id(), [("name", Value::from("nobody"))])
        .expect_err("missing key");
    assert_store_invariant(&missing, "missing primary key 'id'");
}

#[test]
fn unknown_fields_and_kind_mismatches_are_rejected() {
    let mut store = owners();

    let unknown = store
        .insert(OWNER.type_id(), [("id", Value::Int(1)), ("age", Value::Int(3))])
        .expect_err("unknown field");
    assert_store_invariant(&unknown, "unknown field 'age'");

    let mismatch = store
        .insert(OWNER.type_id(), [("id", Value::Int(1)), ("name", Value::Bool(true))])
        .expect_err("kind mismatch");
    assert_store_invariant(&mismatch, "expects text, got bool");

    let list = store
        .insert(OWNER.type_id(), [("id", Value::Int(2)), ("name", Value::List(Vec::new()))])
        .expect_err("list");
    assert_store_invariant(&list, "got list");
}

#[test]
fn references_require_a_registered_target() {
    let mut store = MemoryStore::new();
    store.register(&AUTHOR_ALIAS).expect("alias table");

    let err = store
        .insert(
            AUTHOR_ALIAS.type_id(),
            [("id", Value::Int(1)), ("author_id", Value::Int(1))],
        )
        .expect_err("author table missing");
    assert_store_invariant(&err, "unregistered entity");

    store.register(&AUTHOR).expect("author table");
    store
        .insert(
            AUTHOR_ALIAS.type_id(),
            [("id", Value::Int(1)), ("author_id", Value::Int(1))],
        )
        .expect("insert with target registered");
}

#[test]
fn unknown_tables_are_not_found() {
    let mut store = owners();

    let err = store.table(COMMENT.type_id()).expect_err("no comment table");
    assert!(err.is_not_found());

    let err = store
        .insert(COMMENT.type_id(), [("id", Value::Int(1))])
        .expect_err("no comment table");
    assert!(err.is_not_found());
    assert_eq!(store.len(COMMENT.type_id()), 0);
}

#[test]
fn registration_is_idempotent() {
    let mut store = MemoryStore::for_schema(&schema());
    store
        .insert(OWNER.type_id(), [("id", Value::Int(1))])
        .expect("insert");

    store.register(&OWNER).expect("re-register");

    assert_eq!(store.len(OWNER.type_id()), 1);
}

#[test]
fn rows_iterate_in_primary_key_order() {
    let store = seeded_store();
    let table = store.table(COMMENT.type_id()).expect("comments");

    let ids: Vec<i64> = table
        .rows()
        .filter_map(|row| row.get(0).and_then(Value::as_int))
        .collect();
    assert_eq!(ids, [100, 101, 102, 103, 104, 105, 106]);

    let posted = table
        .get(&Value::Int(105))
        .and_then(|row| row.get(4))
        .cloned();
    assert_eq!(posted, Some(Value::Timestamp(at(13))));
}
