use crate::{
    model::PERSON,
    plugins::{note_type_field, person_notes},
};
use datasel_core::{
    plugin::{SelectOption, count_or_default, join_fields, optional_int, split_fields},
    prelude::*,
    render,
};

///
/// LastNoteAuthors
///
/// Names of the people who wrote the most recent public notes on a person,
/// most recent first. Configured as `"<noteTypeId>|<count>"`.
///

#[derive(Clone, Debug, Default)]
pub struct LastNoteAuthors {
    note_types: Vec<SelectOption>,
}

impl LastNoteAuthors {
    pub const ID: PluginId = PluginId::new("people::LastNoteAuthors");

    /// Upper bound offered by the count input.
    pub const MAX_COUNT: i64 = 10;

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
/// LastNoteAuthorsConfig
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LastNoteAuthorsConfig {
    /// Restrict to one note type; any person note type when `None`.
    pub note_type_id: Option<i64>,

    /// Number of authors to list. Zero yields an empty list.
    pub count: u32,
}

impl Default for LastNoteAuthorsConfig {
    fn default() -> Self {
        Self {
            note_type_id: None,
            count: 1,
        }
    }
}

impl ColumnPlugin for LastNoteAuthors {
    type Config = LastNoteAuthorsConfig;

    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: Self::ID,
            title: "Last x Notes' Author",
            column_name: "Last Notes' Authors",
            header: "Last x Notes' Authors",
            applies_to: PERSON.type_id(),
            output: OutputType::sequence_of(ValueKind::Text),
        }
    }

    fn parse_config(&self, raw: &str) -> Result<Self::Config, ConfigFormatError> {
        let fields = split_fields(Self::ID, raw, 2)?;

        Ok(LastNoteAuthorsConfig {
            note_type_id: optional_int(&fields, 0),
            count: count_or_default(Self::ID, &fields, 1, 1)?,
        })
    }

    fn serialize_config(&self, config: &Self::Config) -> String {
        join_fields([note_type_field(config.note_type_id), config.count.to_string()])
    }

    fn build_fragment(&self, config: &Self::Config, param: &ParamName) -> InnerQuery {
        person_notes(param, config.note_type_id)
            .navigate("created_by_alias_id")
            .navigate("person_id")
            .project(Expr::concat(vec![
                Expr::field("nick_name"),
                Expr::text(" "),
                Expr::field("last_name"),
            ]))
            .take(config.count)
    }

    fn inputs(&self, config: &Self::Config) -> Vec<InputDescriptor> {
        vec![
            InputDescriptor::select(
                "noteType",
                "Note Type",
                self.note_types.clone(),
                note_type_field(config.note_type_id),
            ),
            InputDescriptor::integer(
                "count",
                "Number of Notes",
                1,
                Self::MAX_COUNT,
                i64::from(config.count),
            ),
        ]
    }

    fn format_value(&self, value: &Value) -> String {
        render::format_labeled_list(value, |i| format!("Note {i} Author"))
    }
}
