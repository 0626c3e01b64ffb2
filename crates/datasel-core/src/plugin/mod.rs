//! Column plugin contract.
//!
//! A plugin turns a persisted configuration string into an open query
//! fragment over one outer entity type. Plugins are typed through
//! `ColumnPlugin` and stored type-erased behind `PluginHandle`.

mod config;
mod input;
mod registry;


pub use config::{
    ConfigFormatError, ConfigFormatReason, count_or_default, join_fields, optional_int,
    split_fields,
};
pub use input::{InputDescriptor, InputKind, SelectOption, selection_from_inputs};
pub use registry::{PluginRegistry, RegistryError};

use crate::{
    db::query::{expr::ParamName, fragment::InnerQuery, plan::OutputType},
    model::EntityTypeId,
    render,
    value::Value,
};
use derive_more::Display;
use serde::Serialize;
use std::{fmt, sync::Arc};

///
/// PluginId
///
/// Stable plugin identifier persisted in report definitions.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PluginId(&'static str);

impl PluginId {
    #[must_use]
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

///
/// PluginDescriptor
///
/// Capability descriptor: what a plugin attaches to and what it yields.
/// Checked once at registration and again by the composer.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PluginDescriptor {
    pub id: PluginId,

    /// Name shown when picking a plugin.
    pub title: &'static str,

    /// Base name of the projected output column.
    pub column_name: &'static str,

    /// Default column header text.
    pub header: &'static str,

    pub applies_to: EntityTypeId,
    pub output: OutputType,
}

///
/// ColumnPlugin
///
/// Typed plugin contract. Every method is pure: the same configuration
/// always yields the same fragment and the same inputs.
///

pub trait ColumnPlugin: Send + Sync + 'static {
    type Config: Clone + fmt::Debug + PartialEq;

    fn descriptor(&self) -> PluginDescriptor;

    /// Parse a persisted configuration string.
    ///
    /// Missing optional trailing fields take their defaults.
    fn parse_config(&self, raw: &str) -> Result<Self::Config, ConfigFormatError>;

    /// Inverse of `parse_config`.
    fn serialize_config(&self, config: &Self::Config) -> String;

    /// Build the open fragment for `config`, correlated through `param`.
    fn build_fragment(&self, config: &Self::Config, param: &ParamName) -> InnerQuery;

    /// UI inputs whose serialized state is the configuration string.
    fn inputs(&self, config: &Self::Config) -> Vec<InputDescriptor>;

    fn format_value(&self, value: &Value) -> String {
        render::format_value(value)
    }
}

///
/// DynColumnPlugin
///
/// Object-safe view of a `ColumnPlugin` working on raw selection strings.
///

pub trait DynColumnPlugin: Send + Sync {
    fn describe(&self) -> PluginDescriptor;

    /// Parse and re-serialize a selection string.
    fn normalize_selection(&self, raw: &str) -> Result<String, ConfigFormatError>;

    fn build_from_selection(
        &self,
        raw: &str,
        param: &ParamName,
    ) -> Result<InnerQuery, ConfigFormatError>;

    fn input_descriptors(&self, raw: &str) -> Result<Vec<InputDescriptor>, ConfigFormatError>;

    fn format_output(&self, value: &Value) -> String;
}

impl<P: ColumnPlugin> DynColumnPlugin for P {
    fn describe(&self) -> PluginDescriptor {
        self.descriptor()
    }

    fn normalize_selection(&self, raw: &str) -> Result<String, ConfigFormatError> {
        let config = self.parse_config(raw)?;

        Ok(self.serialize_config(&config))
    }

    fn build_from_selection(
        &self,
        raw: &str,
        param: &ParamName,
    ) -> Result<InnerQuery, ConfigFormatError> {
        let config = self.parse_config(raw)?;

        Ok(self.build_fragment(&config, param))
    }

    fn input_descriptors(&self, raw: &str) -> Result<Vec<InputDescriptor>, ConfigFormatError> {
        let config = self.parse_config(raw)?;

        Ok(self.inputs(&config))
    }

    fn format_output(&self, value: &Value) -> String {
        self.format_value(value)
    }
}

/// Shared, type-erased plugin instance.
pub type PluginHandle = Arc<dyn DynColumnPlugin>;
