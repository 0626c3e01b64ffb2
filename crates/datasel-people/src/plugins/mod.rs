//! Computed-column plugins over person notes.

mod last_note_authors;
mod last_note_date;


pub use last_note_authors::{LastNoteAuthors, LastNoteAuthorsConfig};
pub use last_note_date::{LastPublicNoteDate, LastPublicNoteDateConfig};

use crate::model::{NOTE, NOTE_TYPE, PERSON};
use datasel_core::{
    db::store::{DataRow, MemoryStore},
    error::InternalError,
    plugin::{PluginRegistry, RegistryError, SelectOption},
    prelude::*,
};

/// Visible notes of the correlated person, newest first.
///
/// Only notes whose type annotates people are eligible. Ties on
/// `created_at` are broken by ascending note id.
pub(crate) fn person_notes(param: &ParamName, note_type_id: Option<i64>) -> InnerQuery {
    let mut predicate = Predicate::eq("entity_id", Expr::Param(param.clone()))
        & Predicate::eq("note_type_id.entity_type", Expr::text(PERSON.path))
        & Predicate::eq("is_private", Expr::literal(false));
    if let Some(id) = note_type_id {
        predicate = predicate & Predicate::eq("note_type_id", Expr::literal(id));
    }

    InnerQuery::scan(NOTE.type_id(), param.clone())
        .filter(predicate)
        .order_by(vec![OrderKey::desc("created_at"), OrderKey::asc("id")])
}

/// Serialized note-type field of a configuration string.
pub(crate) fn note_type_field(note_type_id: Option<i64>) -> String {
    note_type_id.map(|id| id.to_string()).unwrap_or_default()
}

/// Selector options for person note types, ordered by display order then
/// name, led by an empty "any type" option.
pub fn note_type_options(store: &MemoryStore) -> Result<Vec<SelectOption>, InternalError> {
    let table = store.table(NOTE_TYPE.type_id())?;
    let field = |row: &DataRow, name: &str| {
        NOTE_TYPE
            .field_slot(name)
            .and_then(|slot| row.get(slot))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let mut note_types: Vec<(i64, String, String)> = table
        .rows()
        .filter(|row| field(row, "entity_type").as_text() == Some(PERSON.path))
        .map(|row| {
            (
                field(row, "display_order").as_int().unwrap_or(i64::MAX),
                field(row, "name").to_display_text(),
                field(row, "id").to_display_text(),
            )
        })
        .collect();
    note_types.sort();

    let mut options = vec![SelectOption::new("", "")];
    options.extend(
        note_types
            .into_iter()
            .map(|(_, name, id)| SelectOption::new(id, name)),
    );

    Ok(options)
}

/// Register every people plugin, offering `note_types` in their selectors.
pub fn register_plugins(
    registry: &mut PluginRegistry,
    note_types: &[SelectOption],
) -> Result<(), RegistryError> {
    registry.register(LastNoteAuthors::with_note_types(note_types.to_vec()))?;
    registry.register(LastPublicNoteDate::with_note_types(note_types.to_vec()))?;

    Ok(())
}
