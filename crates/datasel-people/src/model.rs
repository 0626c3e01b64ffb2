//! Person, alias, and note entity models.
//!
//! Notes point at their owner through `entity_id` (untyped: a note type
//! decides which entity kind it annotates) and at their author through a
//! person alias, so author resolution is always two reference hops.

use datasel_core::model::{
    EntityFieldModel, EntityModel, EntityTypeId, FieldKind, Schema, SchemaError,
};

///
/// PERSON
///

pub static PERSON: EntityModel = EntityModel {
    path: "people::Person",
    entity_name: "Person",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("nick_name", FieldKind::Text),
        EntityFieldModel::new("last_name", FieldKind::Text),
    ],
};

///
/// PERSON_ALIAS
///
/// Historical identity of a person; notes record the alias, never the
/// person directly.
///

pub static PERSON_ALIAS: EntityModel = EntityModel {
    path: "people::PersonAlias",
    entity_name: "PersonAlias",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new(
            "person_id",
            FieldKind::Ref {
                target: "people::Person",
            },
        ),
    ],
};

///
/// NOTE_TYPE
///

pub static NOTE_TYPE: EntityModel = EntityModel {
    path: "people::NoteType",
    entity_name: "NoteType",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("name", FieldKind::Text),
        EntityFieldModel::new("display_order", FieldKind::Int),
        // path of the entity type this note type annotates
        EntityFieldModel::new("entity_type", FieldKind::Text),
    ],
};

///
/// NOTE
///

pub static NOTE: EntityModel = EntityModel {
    path: "people::Note",
    entity_name: "Note",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("entity_id", FieldKind::Int),
        EntityFieldModel::new(
            "note_type_id",
            FieldKind::Ref {
                target: "people::NoteType",
            },
        ),
        EntityFieldModel::new("is_private", FieldKind::Bool),
        EntityFieldModel::new("created_at", FieldKind::Timestamp),
        EntityFieldModel::new(
            "created_by_alias_id",
            FieldKind::Ref {
                target: "people::PersonAlias",
            },
        ),
        EntityFieldModel::new("text", FieldKind::Text),
    ],
};

/// Every people entity model, in registration order.
pub static MODELS: [&EntityModel; 4] = [&PERSON, &PERSON_ALIAS, &NOTE_TYPE, &NOTE];

/// Schema holding the people entities.
pub fn schema() -> Result<Schema, SchemaError> {
    Schema::from_models(&MODELS)
}

/// Entity type the note plugins attach to.
#[must_use]
pub fn person_type() -> EntityTypeId {
    PERSON.type_id()
}
