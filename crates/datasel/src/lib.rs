//! ## Crate layout
//! - `core`: values, entity models, correlated query plans, the fragment
//!   extractor, the report query composer, execution, and observability.
//! - `people`: person note models and their computed-column plugins.
//!
//! The `prelude` module is what plugin authors and report hosts import.

pub use datasel_core as core;
#[cfg(feature = "people")]
pub use datasel_people as people;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use datasel_core::{
    DEFAULT_CORRELATION_PARAM,
    db::{ReportError, ReportSession},
    error::InternalError,
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        db::{
            BaseQuery, ColumnFragment, ComposedQuery, MemoryStore, QueryBackend,
            ReportQueryComposer, ReportRows, ReportSession,
        },
        obs::{MetricsSink, metrics_report, metrics_reset_all},
        plugin::{DynColumnPlugin as _, PluginRegistry},
        prelude::*,
        report::{ComputedColumnDef, ReportDefinition, ReportOutput},
    };
    pub use serde::{Deserialize, Serialize};
}
