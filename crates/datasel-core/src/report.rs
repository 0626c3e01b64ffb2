//! Persisted report definitions and rendered report output.

use crate::{
    db::{ReportRows, query::fingerprint::QueryFingerprint},
    model::EntityTypeId,
    plugin::PluginId,
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// ReportDefinition
///
/// What a report author saves: the outer entity, plain columns, and the
/// ordered computed columns with their plugin selection strings.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReportDefinition {
    pub entity: String,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub computed: Vec<ComputedColumnDef>,
}

impl ReportDefinition {
    #[must_use]
    pub fn new(entity: EntityTypeId) -> Self {
        Self {
            entity: entity.as_str().to_string(),
            columns: Vec::new(),
            computed: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    #[must_use]
    pub fn computed(mut self, column: ComputedColumnDef) -> Self {
        self.computed.push(column);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

///
/// ComputedColumnDef
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ComputedColumnDef {
    pub plugin: String,

    /// Plugin configuration string, stored verbatim.
    #[serde(default)]
    pub selection: String,

    /// Header override; the plugin's default header otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl ComputedColumnDef {
    #[must_use]
    pub fn new(plugin: PluginId, selection: impl Into<String>) -> Self {
        Self {
            plugin: plugin.as_str().to_string(),
            selection: selection.into(),
            header: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

///
/// RenderedRow
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RenderedRow {
    pub key: Value,
    pub cells: Vec<String>,
}

///
/// ReportOutput
///
/// Display text per cell alongside the typed rows it was formatted from.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReportOutput {
    pub headers: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub data: ReportRows,
    pub fingerprint: String,
}

impl ReportOutput {
    pub(crate) fn new(
        headers: Vec<String>,
        rows: Vec<RenderedRow>,
        data: ReportRows,
        fingerprint: QueryFingerprint,
    ) -> Self {
        Self {
            headers,
            rows,
            data,
            fingerprint: fingerprint.as_hex(),
        }
    }

    /// Cell text under the first header equal to `header`.
    ///
    /// Computed columns sharing a default header repeat it; address those by
    /// column name with [`Self::column_cell`].
    #[must_use]
    pub fn cell(&self, key: &Value, header: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == header)?;

        self.cell_at(key, index)
    }

    /// Cell text under the unique column name (`Name`, `Name_2`, ...).
    #[must_use]
    pub fn column_cell(&self, key: &Value, column: &str) -> Option<&str> {
        let index = self.data.column_index(column)?;

        self.cell_at(key, index)
    }

    fn cell_at(&self, key: &Value, index: usize) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| &row.key == key)
            .and_then(|row| row.cells.get(index))
            .map(String::as_str)
    }
}
