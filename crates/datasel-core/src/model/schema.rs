use crate::{
    model::{EntityModel, EntityTypeId, FieldKind},
    value::ValueKind,
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("entity '{0}' already registered")]
    DuplicateEntity(&'static str),

    #[error("entity '{entity}' declares primary key '{field}' which is not a field")]
    MissingPrimaryKey {
        entity: &'static str,
        field: &'static str,
    },

    #[error("entity '{entity}' primary key '{field}' must be a scalar field")]
    ReferencePrimaryKey {
        entity: &'static str,
        field: &'static str,
    },

    #[error("field '{entity}.{field}' references unknown entity '{target}'")]
    DanglingReference {
        entity: &'static str,
        field: &'static str,
        target: &'static str,
    },
}

///
/// Schema
///
/// Set of entity models visible to planning and execution.
/// Built once at startup and shared read-only afterwards.
///

#[derive(Clone, Debug, Default)]
pub struct Schema {
    entities: BTreeMap<&'static str, &'static EntityModel>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of models and check that every reference resolves.
    pub fn from_models(models: &[&'static EntityModel]) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        for model in models {
            schema.register(model)?;
        }
        schema.validate_references()?;

        Ok(schema)
    }

    /// Register one entity model.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), SchemaError> {
        if self.entities.contains_key(model.path) {
            return Err(SchemaError::DuplicateEntity(model.path));
        }

        let Some(pk) = model.primary_key_field() else {
            return Err(SchemaError::MissingPrimaryKey {
                entity: model.path,
                field: model.primary_key,
            });
        };
        if pk.kind.scalar_kind().is_none() {
            return Err(SchemaError::ReferencePrimaryKey {
                entity: model.path,
                field: pk.name,
            });
        }

        self.entities.insert(model.path, model);

        Ok(())
    }

    /// Check that every reference field targets a registered entity.
    pub fn validate_references(&self) -> Result<(), SchemaError> {
        for model in self.entities.values() {
            for field in model.fields {
                if let Some(target) = field.kind.ref_target()
                    && !self.entities.contains_key(target)
                {
                    return Err(SchemaError::DanglingReference {
                        entity: model.path,
                        field: field.name,
                        target,
                    });
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn entity(&self, id: EntityTypeId) -> Option<&'static EntityModel> {
        self.entity_by_path(id.as_str())
    }

    #[must_use]
    pub fn entity_by_path(&self, path: &str) -> Option<&'static EntityModel> {
        self.entities.get(path).copied()
    }

    #[must_use]
    pub fn contains(&self, id: EntityTypeId) -> bool {
        self.entities.contains_key(id.as_str())
    }

    /// Iterate registered models in path order.
    pub fn iter(&self) -> impl Iterator<Item = &'static EntityModel> + '_ {
        self.entities.values().copied()
    }

    /// Scalar kind stored by a field; references resolve to the target key kind.
    #[must_use]
    pub fn value_kind(&self, kind: FieldKind) -> Option<ValueKind> {
        match kind {
            FieldKind::Ref { target } => self
                .entity_by_path(target)
                .and_then(EntityModel::primary_key_field)
                .and_then(|pk| pk.kind.scalar_kind()),
            other => other.scalar_kind(),
        }
    }
}
