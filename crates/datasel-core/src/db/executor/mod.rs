//! Query execution.
//!
//! `QueryBackend` is the single persistence roundtrip of a report render.
//! `MemoryExecutor` runs a composed query against a `MemoryStore` in one
//! pass: every closed fragment is evaluated as a correlated sub-select per
//! outer row.

mod row;

#[cfg(test)]
mod tests;

use crate::{
    db::{
        query::{
            compose::ComposedQuery,
            extract::ClosedFragment,
            plan::{Cardinality, OrderDirection, OrderKey, PlanNode},
            predicate::{Row, Scope, eval, eval_expr},
        },
        store::MemoryStore,
    },
    error::InternalError,
    obs::sink::{MetricsEvent, Span, record},
    value::{Value, compare_order},
};
use row::BoundRow;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::cmp::Ordering;

///
/// QueryBackend
///
/// Executes a composed query. Errors, including cancellation raised by the
/// persistence layer, are returned unchanged to the caller.
///

pub trait QueryBackend {
    fn execute(&self, query: &ComposedQuery) -> Result<ReportRows, InternalError>;
}

///
/// ReportRow
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReportRow {
    /// Identity of the outer row.
    pub key: Value,

    /// Base columns then computed columns, in column order.
    pub values: Vec<Value>,
}

///
/// ReportRows
///
/// Typed result of one execution.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReportRows {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportRows {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` for the row whose identity is `key`.
    #[must_use]
    pub fn value(&self, key: &Value, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;

        self.rows
            .iter()
            .find(|row| &row.key == key)
            .and_then(|row| row.values.get(index))
    }
}

///
/// MemoryExecutor
///

#[derive(Clone, Copy)]
pub struct MemoryExecutor<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryExecutor<'a> {
    #[must_use]
    pub const fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

impl QueryBackend for MemoryExecutor<'_> {
    fn execute(&self, query: &ComposedQuery) -> Result<ReportRows, InternalError> {
        let entity_path = query.entity().as_str();
        let mut span = Span::new(entity_path);

        for column in query.columns() {
            ensure_closed(column.fragment())?;
        }

        let table = self.store.table(query.entity())?;
        let model = table.model();
        let scanned = Cell::new(0u64);
        let base = query.base();

        let mut outer_rows: Vec<BoundRow<'_>> = table
            .rows()
            .inspect(|_| scanned.set(scanned.get() + 1))
            .map(|row| BoundRow::new(self.store, model, row))
            .filter(|row| {
                base.predicate()
                    .is_none_or(|predicate| eval(row, Scope::root(), predicate))
            })
            .collect();
        sort_rows(&mut outer_rows, Scope::root(), base.order());

        let mut rows = Vec::with_capacity(outer_rows.len());
        for outer in &outer_rows {
            let mut values: Vec<Value> = base
                .column_names()
                .iter()
                .map(|column| outer.field(column).into_value())
                .collect();

            for column in query.columns() {
                values.push(run_fragment(self.store, column.fragment(), outer, &scanned)?);
            }

            rows.push(ReportRow {
                key: outer.key(),
                values,
            });
        }

        record(MetricsEvent::RowsScanned {
            entity_path,
            rows_scanned: scanned.get(),
        });
        span.set_rows(rows.len() as u64);
        tracing::debug!(
            entity = entity_path,
            rows = rows.len(),
            rows_scanned = scanned.get(),
            "executed report query",
        );

        Ok(ReportRows {
            columns: query.column_names(),
            rows,
        })
    }
}

impl QueryBackend for MemoryStore {
    fn execute(&self, query: &ComposedQuery) -> Result<ReportRows, InternalError> {
        MemoryExecutor::new(self).execute(query)
    }
}

// Stream between pipeline nodes: entity rows until a projection, values after.
enum Stream<'s> {
    Rows(Box<dyn Iterator<Item = BoundRow<'s>> + 's>),
    Values(Box<dyn Iterator<Item = Value> + 's>),
}

fn ensure_closed(fragment: &ClosedFragment) -> Result<(), InternalError> {
    if fragment.param_refs() > 0 {
        return Err(InternalError::executor_invariant(
            "fragment still has free correlation parameters",
        ));
    }
    if let Some(key) = fragment.plan().session_refs().first() {
        return Err(InternalError::executor_unsupported(format!(
            "fragment reads session state '{key}'"
        )));
    }

    Ok(())
}

// Evaluate one closed fragment for one outer row. Lazy until a sort; `Take`
// stops pulling rows once satisfied.
fn run_fragment<'s>(
    store: &'s MemoryStore,
    fragment: &'s ClosedFragment,
    outer: &'s BoundRow<'s>,
    scanned: &'s Cell<u64>,
) -> Result<Value, InternalError> {
    let scope = Scope::correlated(outer);
    let mut stream: Option<Stream<'s>> = None;
    let mut model = None;

    for node in fragment.plan().pipeline() {
        stream = Some(match (node, stream.take()) {
            (PlanNode::Scan { entity }, None) => {
                let table = store.table(*entity)?;
                let table_model = table.model();
                model = Some(table_model);
                Stream::Rows(Box::new(
                    table
                        .rows()
                        .inspect(move |_| scanned.set(scanned.get() + 1))
                        .map(move |row| BoundRow::new(store, table_model, row)),
                ))
            }
            (PlanNode::Filter { predicate, .. }, Some(Stream::Rows(rows))) => Stream::Rows(
                Box::new(rows.filter(move |row| eval(row, scope, predicate))),
            ),
            (PlanNode::OrderBy { keys, .. }, Some(Stream::Rows(rows))) => {
                let mut sorted: Vec<BoundRow<'s>> = rows.collect();
                sort_rows(&mut sorted, scope, keys);
                Stream::Rows(Box::new(sorted.into_iter()))
            }
            (PlanNode::Take { count, .. }, Some(Stream::Rows(rows))) => {
                Stream::Rows(Box::new(rows.take(*count as usize)))
            }
            (PlanNode::Take { count, .. }, Some(Stream::Values(values))) => {
                Stream::Values(Box::new(values.take(*count as usize)))
            }
            (PlanNode::Navigate { field, .. }, Some(Stream::Rows(rows))) => {
                let target = model
                    .and_then(|m| m.field(field))
                    .and_then(|f| f.kind.ref_target())
                    .ok_or_else(|| {
                        InternalError::executor_invariant(format!(
                            "navigate over non-reference field '{field}'"
                        ))
                    })?;
                let table = store.table_by_path(target)?;
                model = Some(table.model());
                Stream::Rows(Box::new(
                    rows.filter_map(move |row| row.follow(field, table)),
                ))
            }
            (PlanNode::Project { expr, .. }, Some(Stream::Rows(rows))) => {
                Stream::Values(Box::new(rows.map(move |row| eval_expr(&row, scope, expr))))
            }
            (node, _) => {
                return Err(InternalError::executor_invariant(format!(
                    "operator cannot run at this position: {node}"
                )));
            }
        });
    }

    let Some(Stream::Values(mut values)) = stream else {
        return Err(InternalError::executor_invariant(
            "fragment does not end in a projection",
        ));
    };

    Ok(match fragment.cardinality() {
        Cardinality::Sequence => Value::List(values.collect()),
        Cardinality::Scalar => values.next().unwrap_or(Value::Null),
    })
}

// Stable sort; nulls and incomparable values sort after comparable ones in
// ascending order.
fn sort_rows(rows: &mut [BoundRow<'_>], scope: Scope<'_>, keys: &[OrderKey]) {
    if keys.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for key in keys {
            let left = eval_expr(a, scope, &key.expr);
            let right = eval_expr(b, scope, &key.expr);
            let ordering = match compare_order(&left, &right) {
                Some(ordering) => ordering,
                None => match (left.is_null(), right.is_null()) {
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    _ => Ordering::Equal,
                },
            };
            let ordering = match key.direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    });
}
