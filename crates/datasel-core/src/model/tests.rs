use super::*;
use crate::test_fixtures::{AUTHOR, AUTHOR_ALIAS, COMMENT, OWNER};
use crate::value::ValueKind;

static BAD_KEY: EntityModel = EntityModel {
    path: "model_tests::BadKey",
    entity_name: "BadKey",
    primary_key: "missing",
    fields: &[EntityFieldModel::new("id", FieldKind::Int)],
};

static REF_KEY: EntityModel = EntityModel {
    path: "model_tests::RefKey",
    entity_name: "RefKey",
    primary_key: "id",
    fields: &[EntityFieldModel::new(
        "id",
        FieldKind::Ref {
            target: "fixtures::Owner",
        },
    )],
};

#[test]
fn from_models_rejects_dangling_references() {
    let err = Schema::from_models(&[&OWNER, &COMMENT]).expect_err("alias target is missing");

    assert_eq!(
        err,
        SchemaError::DanglingReference {
            entity: "fixtures::Comment",
            field: "alias_id",
            target: "fixtures::AuthorAlias",
        }
    );
}

#[test]
fn register_rejects_duplicates_and_bad_keys() {
    let mut schema = Schema::new();
    schema.register(&OWNER).expect("first registration");

    assert_eq!(
        schema.register(&OWNER),
        Err(SchemaError::DuplicateEntity("fixtures::Owner"))
    );
    assert!(matches!(
        schema.register(&BAD_KEY),
        Err(SchemaError::MissingPrimaryKey { field: "missing", .. })
    ));
    assert!(matches!(
        schema.register(&REF_KEY),
        Err(SchemaError::ReferencePrimaryKey { .. })
    ));
}

#[test]
fn reference_fields_resolve_to_target_key_kind() {
    let schema =
        Schema::from_models(&[&OWNER, &AUTHOR, &AUTHOR_ALIAS, &COMMENT]).expect("schema");
    let alias = COMMENT.field("alias_id").expect("alias field");

    assert_eq!(schema.value_kind(alias.kind), Some(ValueKind::Int));
    assert_eq!(COMMENT.field_slot("posted_at"), Some(4));
    assert!(schema.contains(OWNER.type_id()));
}
