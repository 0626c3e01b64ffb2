use crate::model::field::EntityFieldModel;
use derive_more::Display;
use serde::Serialize;

///
/// EntityTypeId
///
/// Stable identifier of an entity type; wraps the entity path.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct EntityTypeId(&'static str);

impl EntityTypeId {
    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

///
/// EntityModel
/// Minimal runtime model for one entity.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified entity path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Stable external name used in rendered queries.
    pub entity_name: &'static str,
    /// Primary key field name (must name an entry in `fields`).
    pub primary_key: &'static str,
    /// Ordered field list; row slots follow this order.
    pub fields: &'static [EntityFieldModel],
}

impl EntityModel {
    #[must_use]
    pub const fn type_id(&self) -> EntityTypeId {
        EntityTypeId(self.path)
    }

    /// Resolve a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static EntityFieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Resolve the row slot of a field by name.
    #[must_use]
    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Primary key field metadata; `None` only for a malformed model.
    #[must_use]
    pub fn primary_key_field(&self) -> Option<&'static EntityFieldModel> {
        self.field(self.primary_key)
    }
}
