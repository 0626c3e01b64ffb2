//! In-memory entity tables keyed by primary key.
//!
//! Rows are stored as slot-ordered value vectors following the entity model's
//! field order. Iteration is in primary-key order so execution is
//! deterministic.

#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    model::{EntityModel, EntityTypeId, Schema, SchemaError},
    value::{Value, ValueKind},
};
use std::collections::BTreeMap;

///
/// DataRow
///
/// One stored row: values by field slot.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataRow {
    values: Vec<Value>,
}

impl DataRow {
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

///
/// Table
///

#[derive(Clone, Debug)]
pub struct Table {
    model: &'static EntityModel,
    rows: BTreeMap<Value, DataRow>,
}

impl Table {
    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&DataRow> {
        self.rows.get(key)
    }

    /// Rows in primary-key order.
    pub fn rows(&self) -> impl Iterator<Item = &DataRow> {
        self.rows.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

///
/// MemoryStore
///
/// Tables for every entity of a schema.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    schema: Schema,
    tables: BTreeMap<&'static str, Table>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table for every entity in `schema`.
    #[must_use]
    pub fn for_schema(schema: &Schema) -> Self {
        let tables = schema
            .iter()
            .map(|model| {
                (
                    model.path,
                    Table {
                        model,
                        rows: BTreeMap::new(),
                    },
                )
            })
            .collect();

        Self {
            schema: schema.clone(),
            tables,
        }
    }

    /// Register an entity table; a no-op when it already exists.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), SchemaError> {
        if self.tables.contains_key(model.path) {
            return Ok(());
        }

        self.schema.register(model)?;
        self.tables.insert(
            model.path,
            Table {
                model,
                rows: BTreeMap::new(),
            },
        );

        Ok(())
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert one row given as (field name, value) pairs.
    ///
    /// Omitted fields are stored as `Null`. The primary key must be present
    /// and unique within the table.
    pub fn insert<'f, I, V>(&mut self, entity: EntityTypeId, fields: I) -> Result<(), InternalError>
    where
        I: IntoIterator<Item = (&'f str, V)>,
        V: Into<Value>,
    {
        let schema = &self.schema;
        let table = self
            .tables
            .get_mut(entity.as_str())
            .ok_or_else(|| InternalError::store_not_found(entity.as_str()))?;
        let model = table.model;

        let mut values = vec![Value::Null; model.fields.len()];
        for (name, value) in fields {
            let Some(slot) = model.field_slot(name) else {
                return Err(InternalError::store_invariant(format!(
                    "unknown field '{name}' on entity '{}'",
                    model.path
                )));
            };
            values[slot] = coerce_kind(schema, model, slot, value.into())?;
        }

        let key = model
            .field_slot(model.primary_key)
            .and_then(|slot| values.get(slot))
            .cloned()
            .unwrap_or(Value::Null);
        if key.is_null() {
            return Err(InternalError::store_invariant(format!(
                "missing primary key '{}' on entity '{}'",
                model.primary_key, model.path
            )));
        }
        if table.rows.contains_key(&key) {
            return Err(InternalError::store_invariant(format!(
                "duplicate primary key {} on entity '{}'",
                key.to_display_text(),
                model.path
            )));
        }

        table.rows.insert(key, DataRow { values });

        Ok(())
    }

    pub fn table(&self, entity: EntityTypeId) -> Result<&Table, InternalError> {
        self.table_by_path(entity.as_str())
    }

    pub fn table_by_path(&self, path: &str) -> Result<&Table, InternalError> {
        self.tables
            .get(path)
            .ok_or_else(|| InternalError::store_not_found(path))
    }

    /// Fetch one row by primary key.
    #[must_use]
    pub fn get(&self, entity: EntityTypeId, key: &Value) -> Option<&DataRow> {
        self.tables.get(entity.as_str())?.get(key)
    }

    /// Number of rows in an entity table; zero when the table is unknown.
    #[must_use]
    pub fn len(&self, entity: EntityTypeId) -> usize {
        self.tables.get(entity.as_str()).map_or(0, Table::len)
    }
}

// Integer values are normalized to the field's integer kind so keys and
// references compare equal in table lookups.
fn coerce_kind(
    schema: &Schema,
    model: &'static EntityModel,
    slot: usize,
    value: Value,
) -> Result<Value, InternalError> {
    let field = &model.fields[slot];
    let mismatch = |expected: &dyn std::fmt::Display, value: &Value| {
        InternalError::store_invariant(format!(
            "field '{}' on entity '{}' expects {expected}, got {}",
            field.name,
            model.path,
            value.kind().map_or_else(|| "list".to_string(), |k| k.to_string())
        ))
    };

    if value.is_null() {
        return Ok(value);
    }
    let expected = schema.value_kind(field.kind).ok_or_else(|| {
        InternalError::store_invariant(format!(
            "field '{}' on entity '{}' references an unregistered entity",
            field.name, model.path
        ))
    })?;

    match (expected, value) {
        (ValueKind::Int, Value::Uint(v)) => i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| mismatch(&expected, &Value::Uint(v))),
        (ValueKind::Uint, Value::Int(v)) => u64::try_from(v)
            .map(Value::Uint)
            .map_err(|_| mismatch(&expected, &Value::Int(v))),
        (expected, value) if value.kind() == Some(expected) => Ok(value),
        (expected, value) => Err(mismatch(&expected, &value)),
    }
}
