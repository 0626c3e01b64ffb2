//! SQL rendering of composed report queries.
//!
//! Every computed column becomes one correlated sub-select in the outer
//! select list: `ARRAY(SELECT ...)` for sequences and `(SELECT ... LIMIT 1)`
//! for scalars. The outer row is always aliased `o`.

use crate::{
    db::query::{
        compose::ComposedQuery,
        expr::Expr,
        plan::{Cardinality, OrderDirection, OrderKey, PlanNode},
        predicate::{ComparePredicate, Predicate},
    },
    model::{EntityModel, Schema},
    value::Value,
};
use std::fmt::Write as _;
use thiserror::Error as ThisError;

const OUTER_ALIAS: &str = "o";

///
/// SqlRenderError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum SqlRenderError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("'{op}' after '{after}' cannot be flattened into one sub-select")]
    NotFlattenable { op: &'static str, after: &'static str },

    #[error("expression '{expr}' has no SQL rendering")]
    UnsupportedExpr { expr: String },
}

/// Render the composed query as one SQL statement.
pub fn render_sql(schema: &Schema, query: &ComposedQuery) -> Result<String, SqlRenderError> {
    let outer_model = model_for(schema, query.entity().as_str())?;
    let mut renderer = Renderer {
        schema,
        next_alias: 0,
    };

    let mut select = vec![format!(
        "{OUTER_ALIAS}.{}",
        quote_ident(outer_model.primary_key)
    )];
    for column in query.base().column_names() {
        select.push(renderer.field(outer_model, OUTER_ALIAS, column)?);
    }
    for column in query.columns() {
        let sub = renderer.fragment(column.fragment().plan(), column.fragment().cardinality())?;
        select.push(format!("{sub} AS {}", quote_ident(column.name())));
    }

    let mut sql = format!(
        "SELECT {} FROM {} AS {OUTER_ALIAS}",
        select.join(", "),
        quote_ident(outer_model.entity_name)
    );
    if let Some(predicate) = query.base().predicate() {
        let rendered = renderer.predicate(outer_model, OUTER_ALIAS, predicate)?;
        sql.push_str(" WHERE ");
        sql.push_str(&rendered);
    }
    if !query.base().order().is_empty() {
        let keys = renderer.order(outer_model, OUTER_ALIAS, query.base().order())?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    Ok(sql)
}

// Flattened clauses of one correlated sub-select.
#[derive(Default)]
struct SubSelect {
    from: String,
    joins: Vec<String>,
    filters: Vec<String>,
    order: Vec<String>,
    select: Option<String>,
    limit: Option<u32>,
    last_op: &'static str,
}

struct Renderer<'a> {
    schema: &'a Schema,
    next_alias: usize,
}

impl Renderer<'_> {
    fn alias(&mut self) -> String {
        self.next_alias += 1;
        format!("t{}", self.next_alias)
    }

    fn fragment(
        &mut self,
        plan: &PlanNode,
        cardinality: Cardinality,
    ) -> Result<String, SqlRenderError> {
        let mut sub = SubSelect::default();
        let mut model: Option<&'static EntityModel> = None;
        let mut alias = String::new();

        for node in plan.pipeline() {
            match node {
                PlanNode::Scan { entity } => {
                    let scanned = model_for(self.schema, entity.as_str())?;
                    alias = self.alias();
                    sub.from = format!("{} AS {alias}", quote_ident(scanned.entity_name));
                    model = Some(scanned);
                    sub.last_op = "scan";
                }
                PlanNode::Filter { predicate, .. } => {
                    let current = sub.rows("filter", model)?;
                    let rendered = self.predicate(current, &alias, predicate)?;
                    sub.filters.push(rendered);
                    sub.last_op = "filter";
                }
                PlanNode::OrderBy { keys, .. } => {
                    let current = sub.rows("order_by", model)?;
                    // A later stable sort takes precedence over earlier keys.
                    let mut rendered = self.order(current, &alias, keys)?;
                    rendered.append(&mut sub.order);
                    sub.order = rendered;
                    sub.last_op = "order_by";
                }
                PlanNode::Take { count, .. } => {
                    sub.limit = Some(sub.limit.map_or(*count, |limit| limit.min(*count)));
                    sub.last_op = "take";
                }
                PlanNode::Navigate { field, .. } => {
                    let current = sub.rows("navigate", model)?;
                    let target = self.ref_target(current, field)?;
                    let joined = self.alias();
                    sub.joins.push(format!(
                        "JOIN {} AS {joined} ON {joined}.{} = {alias}.{}",
                        quote_ident(target.entity_name),
                        quote_ident(target.primary_key),
                        quote_ident(field)
                    ));
                    alias = joined;
                    model = Some(target);
                    sub.last_op = "navigate";
                }
                PlanNode::Project { expr, .. } => {
                    let current = sub.rows("project", model)?;
                    sub.select = Some(self.expr(Some(current), &alias, expr)?);
                    sub.last_op = "project";
                }
            }
        }

        let select = sub.select.unwrap_or_else(|| "*".to_string());
        let mut sql = format!("SELECT {select} FROM {}", sub.from);
        for join in &sub.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !sub.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&sub.filters.join(" AND "));
        }
        if !sub.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&sub.order.join(", "));
        }

        Ok(match cardinality {
            Cardinality::Sequence => {
                if let Some(limit) = sub.limit {
                    let _ = write!(sql, " LIMIT {limit}");
                }
                format!("ARRAY({sql})")
            }
            Cardinality::Scalar => {
                let limit = sub.limit.map_or(1, |limit| limit.min(1));
                format!("({sql} LIMIT {limit})")
            }
        })
    }

    fn predicate(
        &mut self,
        model: &'static EntityModel,
        alias: &str,
        predicate: &Predicate,
    ) -> Result<String, SqlRenderError> {
        Ok(match predicate {
            Predicate::True => "TRUE".to_string(),
            Predicate::False => "FALSE".to_string(),
            Predicate::And(children) | Predicate::Or(children) if children.is_empty() => {
                if matches!(predicate, Predicate::And(_)) {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Predicate::And(children) => self.junction(model, alias, children, " AND ")?,
            Predicate::Or(children) => self.junction(model, alias, children, " OR ")?,
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(model, alias, inner)?),
            Predicate::IsNull { field } => format!("{} IS NULL", self.field(model, alias, field)?),
            Predicate::Compare(ComparePredicate { field, op, rhs }) => format!(
                "{} {} {}",
                self.field(model, alias, field)?,
                op.symbol(),
                self.expr(Some(model), alias, rhs)?
            ),
        })
    }

    fn junction(
        &mut self,
        model: &'static EntityModel,
        alias: &str,
        children: &[Predicate],
        sep: &str,
    ) -> Result<String, SqlRenderError> {
        let parts = children
            .iter()
            .map(|child| self.predicate(model, alias, child))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!("({})", parts.join(sep)))
    }

    fn order(
        &mut self,
        model: &'static EntityModel,
        alias: &str,
        keys: &[OrderKey],
    ) -> Result<Vec<String>, SqlRenderError> {
        keys.iter()
            .map(|key| {
                let expr = self.expr(Some(model), alias, &key.expr)?;
                let dir = match key.direction {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                };
                Ok(format!("{expr} {dir}"))
            })
            .collect()
    }

    fn expr(
        &mut self,
        model: Option<&'static EntityModel>,
        alias: &str,
        expr: &Expr,
    ) -> Result<String, SqlRenderError> {
        match expr {
            Expr::Literal(value) => literal(value).ok_or_else(|| unsupported(expr)),
            Expr::Field(path) => match model {
                Some(model) => self.field(model, alias, path),
                None => Err(unsupported(expr)),
            },
            Expr::Outer(outer) => Ok(format!("{OUTER_ALIAS}.{}", quote_ident(outer.field))),
            Expr::Param(_) | Expr::Session(_) => Err(unsupported(expr)),
            // NULL parts concatenate as empty text, as in the in-memory evaluator.
            Expr::Concat(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| match part {
                        Expr::Literal(value) if !value.is_null() => self.expr(model, alias, part),
                        _ => self
                            .expr(model, alias, part)
                            .map(|sql| format!("COALESCE(CAST({sql} AS TEXT), '')")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" || ")))
            }
        }
    }

    // Dotted paths become a scalar sub-select through the reference.
    fn field(
        &mut self,
        model: &'static EntityModel,
        alias: &str,
        path: &str,
    ) -> Result<String, SqlRenderError> {
        let Some((head, tail)) = path.split_once('.') else {
            return Ok(format!("{alias}.{}", quote_ident(path)));
        };

        let target = self.ref_target(model, head)?;
        let hop = self.alias();

        Ok(format!(
            "(SELECT {hop}.{} FROM {} AS {hop} WHERE {hop}.{} = {alias}.{})",
            quote_ident(tail),
            quote_ident(target.entity_name),
            quote_ident(target.primary_key),
            quote_ident(head)
        ))
    }

    fn ref_target(
        &self,
        model: &'static EntityModel,
        field: &str,
    ) -> Result<&'static EntityModel, SqlRenderError> {
        let target = model
            .field(field)
            .and_then(|f| f.kind.ref_target())
            .ok_or_else(|| SqlRenderError::UnknownEntity {
                entity: format!("{}.{field}", model.path),
            })?;

        model_for(self.schema, target)
    }
}

impl SubSelect {
    // Row operators cannot follow a limit or a projection in flat SQL.
    fn rows(
        &self,
        op: &'static str,
        model: Option<&'static EntityModel>,
    ) -> Result<&'static EntityModel, SqlRenderError> {
        if self.limit.is_some() || self.select.is_some() {
            return Err(SqlRenderError::NotFlattenable {
                op,
                after: self.last_op,
            });
        }

        model.ok_or(SqlRenderError::NotFlattenable {
            op,
            after: self.last_op,
        })
    }
}

fn model_for(schema: &Schema, path: &str) -> Result<&'static EntityModel, SqlRenderError> {
    schema
        .entity_by_path(path)
        .ok_or_else(|| SqlRenderError::UnknownEntity {
            entity: path.to_string(),
        })
}

fn literal(value: &Value) -> Option<String> {
    Some(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::Text(s) => quote_text(s),
        Value::Timestamp(_) => format!("TIMESTAMP {}", quote_text(&value.to_display_text())),
        Value::List(_) => return None,
    })
}

fn unsupported(expr: &Expr) -> SqlRenderError {
    SqlRenderError::UnsupportedExpr {
        expr: expr.to_string(),
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
