//! Report query composition: one base query plus N closed fragments folded
//! into a single executable query.

use crate::{
    db::query::{
        expr::OuterRef,
        extract::{ClosedFragment, NonCorrelatedFragment, extract},
        fingerprint::QueryFingerprint,
        fragment::InnerQuery,
        plan::{
            OrderKey, OutputType, PlanError, resolve_field_path, validate_order,
            validate_predicate,
        },
        predicate::Predicate,
        sql::{SqlRenderError, render_sql},
    },
    model::{EntityModel, EntityTypeId, Schema},
    obs::sink::{MetricsEvent, record},
    plugin::{PluginDescriptor, PluginId},
};
use std::{collections::BTreeSet, fmt::Write as _};
use thiserror::Error as ThisError;

///
/// BaseQuery
///
/// Outer row selection: the entity every report row is about, the plain
/// columns read from it, and an optional filter and order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseQuery {
    entity: EntityTypeId,
    columns: Vec<String>,
    predicate: Option<Predicate>,
    order: Vec<OrderKey>,
}

impl BaseQuery {
    #[must_use]
    pub const fn new(entity: EntityTypeId) -> Self {
        Self {
            entity,
            columns: Vec::new(),
            predicate: None,
            order: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a filter; repeated calls are combined with AND.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing & predicate,
            None => predicate,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order.push(key);
        self
    }

    #[must_use]
    pub const fn entity(&self) -> EntityTypeId {
        self.entity
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    #[must_use]
    pub fn order(&self) -> &[OrderKey] {
        &self.order
    }
}

///
/// ColumnFragment
///
/// One (plugin, fragment) pair handed to the composer.
///

#[derive(Clone, Debug)]
pub struct ColumnFragment {
    pub plugin: PluginDescriptor,
    pub inner: InnerQuery,
}

impl ColumnFragment {
    #[must_use]
    pub const fn new(plugin: PluginDescriptor, inner: InnerQuery) -> Self {
        Self { plugin, inner }
    }
}

///
/// ProjectedColumn
///
/// A closed fragment projected as one output column of the composed query.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectedColumn {
    name: String,
    plugin: PluginId,
    output: OutputType,
    fragment: ClosedFragment,
}

impl ProjectedColumn {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn plugin(&self) -> PluginId {
        self.plugin
    }

    #[must_use]
    pub const fn output(&self) -> OutputType {
        self.output
    }

    #[must_use]
    pub const fn fragment(&self) -> &ClosedFragment {
        &self.fragment
    }
}

///
/// ComposedQuery
///
/// The single executable query of one report render.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComposedQuery {
    base: BaseQuery,
    outer: OuterRef,
    columns: Vec<ProjectedColumn>,
}

impl ComposedQuery {
    #[must_use]
    pub const fn entity(&self) -> EntityTypeId {
        self.base.entity
    }

    #[must_use]
    pub const fn base(&self) -> &BaseQuery {
        &self.base
    }

    /// Identity of the outer row every fragment is correlated to.
    #[must_use]
    pub const fn outer(&self) -> OuterRef {
        self.outer
    }

    #[must_use]
    pub fn columns(&self) -> &[ProjectedColumn] {
        &self.columns
    }

    /// Output column names: base columns first, then computed columns in
    /// configuration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.base
            .columns
            .iter()
            .cloned()
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Deterministic multi-line description of the composed query.
    #[must_use]
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "select {}", self.base.entity);
        let _ = write!(out, " key {}", self.outer.field);
        if !self.base.columns.is_empty() {
            let _ = write!(out, " columns [{}]", self.base.columns.join(", "));
        }
        if let Some(predicate) = &self.base.predicate {
            let _ = write!(out, " where {predicate}");
        }
        if !self.base.order.is_empty() {
            let keys: Vec<String> = self.base.order.iter().map(ToString::to_string).collect();
            let _ = write!(out, " order_by [{}]", keys.join(", "));
        }
        for column in &self.columns {
            let _ = write!(
                out,
                "\n  {} <{}> {}: {}",
                column.name,
                column.plugin,
                column.output,
                column.fragment.plan()
            );
        }

        out
    }

    #[must_use]
    pub fn fingerprint(&self) -> QueryFingerprint {
        QueryFingerprint::of(self)
    }

    /// Render as SQL with one correlated sub-select per computed column.
    pub fn to_sql(&self, schema: &Schema) -> Result<String, SqlRenderError> {
        render_sql(schema, self)
    }
}

///
/// FragmentError
///
/// Why one column could not be folded into the composed query.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum FragmentError {
    #[error("{0}")]
    NonCorrelated(#[from] NonCorrelatedFragment),

    #[error("invalid fragment plan: {0}")]
    Plan(#[from] PlanError),

    #[error("fragment yields {inferred} but the plugin declares {declared}")]
    OutputMismatch {
        declared: OutputType,
        inferred: OutputType,
    },
}

///
/// ComposeError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ComposeError {
    #[error("invalid base query: {0}")]
    BaseQuery(PlanError),

    #[error("plugin '{plugin}' applies to '{expected}', not '{found}'")]
    UnsupportedEntityType {
        plugin: PluginId,
        expected: EntityTypeId,
        found: EntityTypeId,
    },

    #[error("column '{column}' from plugin '{plugin}' failed to compose: {source}")]
    FragmentComposition {
        plugin: PluginId,
        column: &'static str,
        source: FragmentError,
    },
}

impl ComposeError {
    /// Plugin responsible for the failure, if any.
    #[must_use]
    pub const fn plugin(&self) -> Option<PluginId> {
        match self {
            Self::BaseQuery(_) => None,
            Self::UnsupportedEntityType { plugin, .. }
            | Self::FragmentComposition { plugin, .. } => Some(*plugin),
        }
    }
}

///
/// ReportQueryComposer
///
/// Folds the base query and every column fragment into one `ComposedQuery`.
/// Stateless apart from the borrowed schema; safe to reuse across renders.
///

#[derive(Clone, Copy)]
pub struct ReportQueryComposer<'a> {
    schema: &'a Schema,
}

impl<'a> ReportQueryComposer<'a> {
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Compose the base query and the ordered fragments.
    ///
    /// Any failing column fails the whole composition; nothing is dropped.
    pub fn compose(
        &self,
        base: BaseQuery,
        fragments: Vec<ColumnFragment>,
    ) -> Result<ComposedQuery, ComposeError> {
        let entity = base.entity;
        record(MetricsEvent::ComposeStart {
            entity_path: entity.as_str(),
        });

        let result = self.compose_inner(base, fragments);
        match &result {
            Ok(query) => tracing::debug!(
                entity = %entity,
                columns = query.columns.len(),
                "composed report query",
            ),
            Err(err) => {
                record(MetricsEvent::ComposeFailed {
                    entity_path: entity.as_str(),
                });
                tracing::warn!(entity = %entity, error = %err, "report query composition failed");
            }
        }

        result
    }

    fn compose_inner(
        &self,
        base: BaseQuery,
        fragments: Vec<ColumnFragment>,
    ) -> Result<ComposedQuery, ComposeError> {
        let model = self.base_model(&base)?;
        let outer = OuterRef::identity(model);

        let mut namer = ColumnNamer::default();
        for column in &base.columns {
            namer.reserve(column);
        }

        let mut columns = Vec::with_capacity(fragments.len());
        for ColumnFragment { plugin, inner } in fragments {
            if plugin.applies_to != base.entity {
                return Err(ComposeError::UnsupportedEntityType {
                    plugin: plugin.id,
                    expected: plugin.applies_to,
                    found: base.entity,
                });
            }

            let (fragment, output) = self
                .close_column(&plugin, inner, outer)
                .map_err(|source| ComposeError::FragmentComposition {
                    plugin: plugin.id,
                    column: plugin.column_name,
                    source,
                })?;

            record(MetricsEvent::FragmentClosed {
                plugin: plugin.id.as_str(),
                substitutions: fragment.substitutions() as u64,
            });

            columns.push(ProjectedColumn {
                name: namer.assign(plugin.column_name),
                plugin: plugin.id,
                output,
                fragment,
            });
        }

        Ok(ComposedQuery {
            base,
            outer,
            columns,
        })
    }

    fn base_model(&self, base: &BaseQuery) -> Result<&'static EntityModel, ComposeError> {
        let model = self.schema.entity(base.entity).ok_or_else(|| {
            ComposeError::BaseQuery(PlanError::UnknownEntity {
                entity: base.entity.to_string(),
            })
        })?;

        for column in &base.columns {
            resolve_field_path(self.schema, model, column).map_err(ComposeError::BaseQuery)?;
        }
        if let Some(predicate) = &base.predicate {
            validate_predicate(self.schema, model, predicate).map_err(ComposeError::BaseQuery)?;
        }
        validate_order(self.schema, model, &base.order).map_err(ComposeError::BaseQuery)?;

        Ok(model)
    }

    fn close_column(
        &self,
        plugin: &PluginDescriptor,
        inner: InnerQuery,
        outer: OuterRef,
    ) -> Result<(ClosedFragment, OutputType), FragmentError> {
        let fragment = extract(inner, outer)?;
        let inferred = fragment.output(self.schema)?;
        if inferred != plugin.output {
            return Err(FragmentError::OutputMismatch {
                declared: plugin.output,
                inferred,
            });
        }

        Ok((fragment, inferred))
    }
}

///
/// ColumnNamer
///
/// Assigns unique output names: the first use keeps the name, later uses get
/// `_2`, `_3`, … in call order.
///

#[derive(Default)]
pub(crate) struct ColumnNamer {
    used: BTreeSet<String>,
}

impl ColumnNamer {
    pub(crate) fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub(crate) fn assign(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }

        let mut ordinal = 2usize;
        loop {
            let candidate = format!("{base}_{ordinal}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            ordinal += 1;
        }
    }
}
