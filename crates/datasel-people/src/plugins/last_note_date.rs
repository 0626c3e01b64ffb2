use crate::{
    model::PERSON,
    plugins::{note_type_field, person_notes},
};
use datasel_core::{
    plugin::{SelectOption, optional_int, split_fields},
    prelude::*,
    render,
};

///
/// LastPublicNoteDate
///
/// When the most recent public note on a person was written. Configured as
/// `"<noteTypeId>"`; renders as a calendar date, empty when there is none.
///

#[derive(Clone, Debug, Default)]
pub struct LastPublicNoteDate {
    note_types: Vec<SelectOption>,
}

impl LastPublicNoteDate {
    pub const ID: PluginId = PluginId::new("people::LastPublicNoteDate");

    #[must_use]
    pub const fn new() -> Self {
        Self {
            note_types: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_note_types(note_types: Vec<SelectOption>) -> Self {
        Self { note_types }
    }
}

///
/// LastPublicNoteDateConfig
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LastPublicNoteDateConfig {
    pub note_type_id: Option<i64>,
}

impl ColumnPlugin for LastPublicNoteDate {
    type Config = LastPublicNoteDateConfig;

    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: Self::ID,
            title: "Last Public Note Date",
            column_name: "Last Public Note Date",
            header: "Last Public Note",
            applies_to: PERSON.type_id(),
            output: OutputType::scalar(ValueKind::Timestamp),
        }
    }

    fn parse_config(&self, raw: &str) -> Result<Self::Config, ConfigFormatError> {
        let fields = split_fields(Self::ID, raw, 1)?;

        Ok(LastPublicNoteDateConfig {
            note_type_id: optional_int(&fields, 0),
        })
    }

    fn serialize_config(&self, config: &Self::Config) -> String {
        note_type_field(config.note_type_id)
    }

    fn build_fragment(&self, config: &Self::Config, param: &ParamName) -> InnerQuery {
        person_notes(param, config.note_type_id)
            .project(Expr::field("created_at"))
            .scalar()
    }

    fn inputs(&self, config: &Self::Config) -> Vec<InputDescriptor> {
        vec![InputDescriptor::select(
            "noteType",
            "Note Type",
            self.note_types.clone(),
            note_type_field(config.note_type_id),
        )]
    }

    fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Timestamp(at) => at.format("%Y-%m-%d").to_string(),
            other => render::format_value(other),
        }
    }
}
