//! Static entity metadata consumed by planning, validation, and execution.

mod entity;
mod field;
mod schema;

#[cfg(test)]
mod tests;

pub use entity::{EntityModel, EntityTypeId};
pub use field::{EntityFieldModel, FieldKind};
pub use schema::{Schema, SchemaError};
