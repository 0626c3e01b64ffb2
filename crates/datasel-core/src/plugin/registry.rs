use crate::{
    DEFAULT_CORRELATION_PARAM,
    db::query::{
        compose::FragmentError,
        expr::{OuterRef, ParamName},
        extract::extract,
    },
    model::{EntityModel, EntityTypeId, Schema},
    plugin::{
        ColumnPlugin, ConfigFormatError, DynColumnPlugin, PluginDescriptor, PluginHandle, PluginId,
    },
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RegistryError {
    #[error("plugin '{plugin}' is already registered")]
    DuplicatePlugin { plugin: PluginId },

    #[error("plugin '{plugin}' applies to unknown entity '{entity}'")]
    UnknownEntity {
        plugin: PluginId,
        entity: EntityTypeId,
    },

    #[error("plugin '{plugin}' rejects its default configuration: {source}")]
    DefaultConfig {
        plugin: PluginId,
        source: ConfigFormatError,
    },

    #[error("plugin '{plugin}' does not honor its descriptor: {source}")]
    Capability {
        plugin: PluginId,
        source: FragmentError,
    },

    #[error("no plugin registered as '{plugin}'")]
    UnknownPlugin { plugin: String },
}

///
/// PluginRegistry
///
/// Registered plugins keyed by the entity type they attach to. Read-only
/// once built; lookups preserve registration order.
///

#[derive(Clone)]
pub struct PluginRegistry {
    schema: Schema,
    entries: Vec<(PluginDescriptor, PluginHandle)>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            entries: Vec::new(),
        }
    }

    pub fn register<P: ColumnPlugin>(
        &mut self,
        plugin: P,
    ) -> Result<PluginDescriptor, RegistryError> {
        self.register_handle(Arc::new(plugin))
    }

    /// Register a type-erased plugin after checking its capability
    /// descriptor against the fragment its default configuration builds.
    pub fn register_handle(
        &mut self,
        handle: PluginHandle,
    ) -> Result<PluginDescriptor, RegistryError> {
        let descriptor = handle.describe();
        if self.entries.iter().any(|(d, _)| d.id == descriptor.id) {
            return Err(RegistryError::DuplicatePlugin {
                plugin: descriptor.id,
            });
        }

        let model =
            self.schema
                .entity(descriptor.applies_to)
                .ok_or(RegistryError::UnknownEntity {
                    plugin: descriptor.id,
                    entity: descriptor.applies_to,
                })?;
        self.check_capability(handle.as_ref(), &descriptor, model)?;

        tracing::debug!(
            plugin = %descriptor.id,
            entity = %descriptor.applies_to,
            output = %descriptor.output,
            "registered column plugin",
        );
        self.entries.push((descriptor, handle));

        Ok(descriptor)
    }

    /// Descriptors of every plugin attachable to `entity`.
    #[must_use]
    pub fn lookup(&self, entity: EntityTypeId) -> Vec<PluginDescriptor> {
        self.entries
            .iter()
            .filter(|(d, _)| d.applies_to == entity)
            .map(|(d, _)| *d)
            .collect()
    }

    pub fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<PluginHandle, RegistryError> {
        self.find(descriptor.id.as_str())
    }

    /// Resolve a plugin by its persisted identifier.
    pub fn find(&self, id: &str) -> Result<PluginHandle, RegistryError> {
        self.entries
            .iter()
            .find(|(d, _)| d.id.as_str() == id)
            .map(|(_, handle)| Arc::clone(handle))
            .ok_or_else(|| RegistryError::UnknownPlugin {
                plugin: id.to_string(),
            })
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_capability(
        &self,
        plugin: &dyn DynColumnPlugin,
        descriptor: &PluginDescriptor,
        model: &'static EntityModel,
    ) -> Result<(), RegistryError> {
        let param = ParamName::new(DEFAULT_CORRELATION_PARAM);
        let inner = plugin
            .build_from_selection("", &param)
            .map_err(|source| RegistryError::DefaultConfig {
                plugin: descriptor.id,
                source,
            })?;

        let capability = |source: FragmentError| RegistryError::Capability {
            plugin: descriptor.id,
            source,
        };
        let fragment = extract(inner, OuterRef::identity(model))
            .map_err(|err| capability(err.into()))?;
        let inferred = fragment
            .output(&self.schema)
            .map_err(|err| capability(err.into()))?;
        if inferred != descriptor.output {
            return Err(capability(FragmentError::OutputMismatch {
                declared: descriptor.output,
                inferred,
            }));
        }

        Ok(())
    }
}
