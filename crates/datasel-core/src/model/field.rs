use crate::value::ValueKind;

///
/// EntityFieldModel
/// Runtime field metadata used by planning and validation.
///

#[derive(Debug)]
pub struct EntityFieldModel {
    /// Field name as used in predicates and projections.
    pub name: &'static str,
    /// Runtime type shape.
    pub kind: FieldKind,
}

impl EntityFieldModel {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

///
/// FieldKind
///
/// Aligned with `Value` scalar variants, plus references to other entities.
/// A reference stores the target's primary key value.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Text,
    Timestamp,
    Ref { target: &'static str },
}

impl FieldKind {
    /// Scalar kind for non-reference fields.
    #[must_use]
    pub const fn scalar_kind(self) -> Option<ValueKind> {
        match self {
            Self::Bool => Some(ValueKind::Bool),
            Self::Int => Some(ValueKind::Int),
            Self::Uint => Some(ValueKind::Uint),
            Self::Text => Some(ValueKind::Text),
            Self::Timestamp => Some(ValueKind::Timestamp),
            Self::Ref { .. } => None,
        }
    }

    #[must_use]
    pub const fn ref_target(self) -> Option<&'static str> {
        match self {
            Self::Ref { target } => Some(target),
            _ => None,
        }
    }
}
