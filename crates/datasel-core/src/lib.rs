//! Core runtime for datasel: values, entity models, correlated query plans,
//! the fragment extractor, the report query composer, column plugins, and
//! observability.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod plugin;
pub mod render;
pub mod report;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Name of the correlation parameter plugins close over by default.
///
/// Any name works as long as it is the only free parameter in a fragment.
pub const DEFAULT_CORRELATION_PARAM: &str = "outer";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, stores, or sessions are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::query::{
            expr::{Expr, ParamName},
            fragment::InnerQuery,
            plan::{Cardinality, OrderKey, OutputType},
            predicate::Predicate,
        },
        model::{EntityFieldModel, EntityModel, EntityTypeId, FieldKind},
        plugin::{ColumnPlugin, ConfigFormatError, InputDescriptor, PluginDescriptor, PluginId},
        value::{Value, ValueKind},
    };
}
