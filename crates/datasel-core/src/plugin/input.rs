use crate::plugin::join_fields;
use serde::Serialize;

///
/// SelectOption
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

///
/// InputKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    Select {
        options: Vec<SelectOption>,
        allow_empty: bool,
    },
    Integer {
        min: i64,
        max: i64,
        default: i64,
    },
}

///
/// InputDescriptor
///
/// One typed UI input. Its `value` is the serialized state of the control;
/// joining every input's value in order gives the configuration string.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
    pub value: String,
}

impl InputDescriptor {
    #[must_use]
    pub fn select(
        name: &'static str,
        label: &'static str,
        options: Vec<SelectOption>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name,
            label,
            kind: InputKind::Select {
                options,
                allow_empty: true,
            },
            value: value.into(),
        }
    }

    #[must_use]
    pub fn integer(
        name: &'static str,
        label: &'static str,
        min: i64,
        max: i64,
        value: i64,
    ) -> Self {
        Self {
            name,
            label,
            kind: InputKind::Integer {
                min,
                max,
                default: min,
            },
            value: value.to_string(),
        }
    }
}

/// Serialize the state of a set of inputs back into a configuration string.
#[must_use]
pub fn selection_from_inputs(inputs: &[InputDescriptor]) -> String {
    join_fields(inputs.iter().map(|input| input.value.as_str()))
}
