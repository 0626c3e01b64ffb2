#[cfg(test)]
mod tests;

use crate::{
    DEFAULT_CORRELATION_PARAM,
    db::{
        executor::QueryBackend,
        query::{
            compose::{BaseQuery, ColumnFragment, ComposeError, ComposedQuery, ReportQueryComposer},
            expr::ParamName,
        },
    },
    error::InternalError,
    obs::sink::{MetricsSink, with_metrics_sink},
    plugin::{ConfigFormatError, PluginHandle, PluginRegistry, RegistryError},
    render,
    report::{RenderedRow, ReportDefinition, ReportOutput},
};
use thiserror::Error as ThisError;

///
/// ReportError
///
/// Top-level failure of one report render. Backend errors, including
/// cancellation, are carried unchanged.
///

#[derive(Debug, ThisError)]
pub enum ReportError {
    #[error("report entity '{entity}' is not registered")]
    UnknownEntity { entity: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigFormatError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Backend(#[from] InternalError),
}

impl ReportError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_cancelled())
    }
}

///
/// PreparedReport
///
/// A composed query plus everything needed to format its result.
///

pub struct PreparedReport {
    query: ComposedQuery,
    headers: Vec<String>,
    plugins: Vec<PluginHandle>,
}

impl PreparedReport {
    #[must_use]
    pub const fn query(&self) -> &ComposedQuery {
        &self.query
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

///
/// ReportSession
///
/// Render-scoped handle with policy (debug, metrics). Every render composes
/// one query and executes it exactly once against the backend.
///

pub struct ReportSession<'a, B: QueryBackend + ?Sized> {
    registry: &'a PluginRegistry,
    backend: &'a B,
    debug: bool,
    metrics: Option<&'static dyn MetricsSink>,
}

impl<'a, B: QueryBackend + ?Sized> ReportSession<'a, B> {
    #[must_use]
    pub const fn new(registry: &'a PluginRegistry, backend: &'a B) -> Self {
        Self {
            registry,
            backend,
            debug: false,
            metrics: None,
        }
    }

    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    /// Resolve plugins, parse selections, build fragments, and compose.
    pub fn prepare(&self, definition: &ReportDefinition) -> Result<PreparedReport, ReportError> {
        self.with_metrics(|| self.prepare_inner(definition))
    }

    /// Compose, execute once, and format.
    pub fn render(&self, definition: &ReportDefinition) -> Result<ReportOutput, ReportError> {
        self.with_metrics(|| {
            let prepared = self.prepare_inner(definition)?;
            let fingerprint = prepared.query.fingerprint();

            if self.debug {
                match prepared.query.to_sql(self.registry.schema()) {
                    Ok(sql) => tracing::debug!(%fingerprint, %sql, "report query"),
                    Err(err) => tracing::debug!(
                        %fingerprint,
                        explain = %prepared.query.explain(),
                        error = %err,
                        "report query has no SQL rendering",
                    ),
                }
            }

            let data = self.backend.execute(&prepared.query).inspect_err(|err| {
                tracing::warn!(
                    %fingerprint,
                    error = %err.display_with_class(),
                    "report query execution failed",
                );
            })?;

            let base_len = prepared.query.base().column_names().len();
            let rows = data
                .rows
                .iter()
                .map(|row| RenderedRow {
                    key: row.key.clone(),
                    cells: row
                        .values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| match i.checked_sub(base_len) {
                            Some(c) => prepared.plugins.get(c).map_or_else(
                                || render::format_value(value),
                                |p| p.format_output(value),
                            ),
                            None => render::format_value(value),
                        })
                        .collect(),
                })
                .collect();

            tracing::info!(
                %fingerprint,
                entity = %prepared.query.entity(),
                columns = prepared.headers.len(),
                rows = data.rows.len(),
                "rendered report",
            );

            Ok(ReportOutput::new(prepared.headers, rows, data, fingerprint))
        })
    }

    fn prepare_inner(&self, definition: &ReportDefinition) -> Result<PreparedReport, ReportError> {
        let schema = self.registry.schema();
        let model = schema
            .entity_by_path(&definition.entity)
            .ok_or_else(|| ReportError::UnknownEntity {
                entity: definition.entity.clone(),
            })?;

        let param = ParamName::new(DEFAULT_CORRELATION_PARAM);
        let mut headers = definition.columns.clone();
        let mut plugins = Vec::with_capacity(definition.computed.len());
        let mut fragments = Vec::with_capacity(definition.computed.len());

        for column in &definition.computed {
            let handle = self.registry.find(&column.plugin)?;
            let descriptor = handle.describe();
            let inner = handle.build_from_selection(&column.selection, &param)?;

            headers.push(
                column
                    .header
                    .clone()
                    .unwrap_or_else(|| descriptor.header.to_string()),
            );
            fragments.push(ColumnFragment::new(descriptor, inner));
            plugins.push(handle);
        }

        let base = BaseQuery::new(model.type_id()).columns(definition.columns.iter().cloned());
        let query = ReportQueryComposer::new(schema).compose(base, fragments)?;

        Ok(PreparedReport {
            query,
            headers,
            plugins,
        })
    }
}
