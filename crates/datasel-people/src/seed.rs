//! Row builders for people, aliases, note types, and notes.

use crate::model::{NOTE, NOTE_TYPE, PERSON, PERSON_ALIAS, schema};
use chrono::{DateTime, Utc};
use datasel_core::{db::store::MemoryStore, error::InternalError, model::SchemaError, value::Value};

///
/// NoteSeed
///

#[derive(Clone, Debug)]
pub struct NoteSeed {
    pub id: i64,
    pub entity_id: i64,
    pub note_type_id: i64,
    pub alias_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub text: String,
}

impl NoteSeed {
    #[must_use]
    pub const fn new(
        id: i64,
        entity_id: i64,
        note_type_id: i64,
        alias_id: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            entity_id,
            note_type_id,
            alias_id,
            created_at,
            is_private: false,
            text: String::new(),
        }
    }

    #[must_use]
    pub const fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

///
/// Seeder
///
/// Populates a `MemoryStore` over the people schema.
///

#[derive(Clone, Debug)]
pub struct Seeder {
    store: MemoryStore,
}

impl Seeder {
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            store: MemoryStore::for_schema(&schema()?),
        })
    }

    /// Insert a person together with an alias sharing its id.
    pub fn person(
        &mut self,
        id: i64,
        nick_name: &str,
        last_name: &str,
    ) -> Result<&mut Self, InternalError> {
        self.store.insert(
            PERSON.type_id(),
            [
                ("id", Value::Int(id)),
                ("nick_name", Value::from(nick_name)),
                ("last_name", Value::from(last_name)),
            ],
        )?;

        self.alias(id, id)
    }

    pub fn alias(&mut self, id: i64, person_id: i64) -> Result<&mut Self, InternalError> {
        self.store.insert(
            PERSON_ALIAS.type_id(),
            [("id", Value::Int(id)), ("person_id", Value::Int(person_id))],
        )?;

        Ok(self)
    }

    /// Insert a note type annotating `entity_type`.
    pub fn note_type(
        &mut self,
        id: i64,
        name: &str,
        display_order: i64,
        entity_type: &str,
    ) -> Result<&mut Self, InternalError> {
        self.store.insert(
            NOTE_TYPE.type_id(),
            [
                ("id", Value::Int(id)),
                ("name", Value::from(name)),
                ("display_order", Value::Int(display_order)),
                ("entity_type", Value::from(entity_type)),
            ],
        )?;

        Ok(self)
    }

    pub fn note(&mut self, note: NoteSeed) -> Result<&mut Self, InternalError> {
        self.store.insert(
            NOTE.type_id(),
            [
                ("id", Value::Int(note.id)),
                ("entity_id", Value::Int(note.entity_id)),
                ("note_type_id", Value::Int(note.note_type_id)),
                ("is_private", Value::Bool(note.is_private)),
                ("created_at", Value::Timestamp(note.created_at)),
                ("created_by_alias_id", Value::Int(note.alias_id)),
                ("text", Value::Text(note.text)),
            ],
        )?;

        Ok(self)
    }

    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> MemoryStore {
        self.store
    }
}
