//! Schema-aware plan validation and output type inference.
//!
//! Validation runs on closed plans: free parameters and session reads are
//! rejected here as a second line behind the extractor.

use crate::{
    db::query::{
        expr::Expr,
        plan::{Cardinality, OrderKey, OutputType, PlanNode},
        predicate::{ComparePredicate, Predicate},
    },
    model::{EntityModel, Schema},
    value::ValueKind,
};
use thiserror::Error as ThisError;

///
/// PlanError
///
/// Validation failures for plans and base queries against a schema.
/// These indicate a malformed plan, not a runtime condition.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: &'static str, field: String },

    #[error("field '{field}' on entity '{entity}' is not a reference")]
    NotAReference { entity: &'static str, field: String },

    #[error("field path '{path}' has more than one reference hop")]
    PathTooDeep { path: String },

    #[error("{op} requires entity rows but follows a projection")]
    RowOperatorAfterProjection { op: &'static str },

    #[error("plan ends on entity rows; a projection is required")]
    MissingProjection,

    #[error("expression '{expr}' has no static type")]
    UntypedExpr { expr: String },

    #[error("cannot compare '{field}' ({left}) with {right}")]
    IncompatibleComparison {
        field: String,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("unbound correlation parameter '{param}'")]
    UnboundParameter { param: String },

    #[error("session state '{key}' cannot be read here")]
    SessionState { key: String },
}

// Current stream shape while walking a pipeline.
#[derive(Clone, Copy)]
enum Shape {
    Rows(&'static EntityModel),
    Values(ValueKind),
}

///
/// Infer the output type of a closed plan.
///
/// Walks the pipeline from the scan, validating every field path and
/// expression against the schema.
///
pub fn infer_output(
    schema: &Schema,
    plan: &PlanNode,
    cardinality: Cardinality,
) -> Result<OutputType, PlanError> {
    let mut shape: Option<Shape> = None;

    for node in plan.pipeline() {
        shape = Some(match node {
            PlanNode::Scan { entity } => Shape::Rows(entity_model(schema, entity.as_str())?),
            PlanNode::Filter { predicate, .. } => {
                let model = rows(shape, "filter")?;
                validate_predicate(schema, model, predicate)?;
                Shape::Rows(model)
            }
            PlanNode::OrderBy { keys, .. } => {
                let model = rows(shape, "order_by")?;
                validate_order(schema, model, keys)?;
                Shape::Rows(model)
            }
            PlanNode::Take { .. } => {
                shape.ok_or(PlanError::RowOperatorAfterProjection { op: "take" })?
            }
            PlanNode::Navigate { field, .. } => {
                let model = rows(shape, "navigate")?;
                Shape::Rows(navigate_target(schema, model, field)?)
            }
            PlanNode::Project { expr, .. } => {
                let model = rows(shape, "project")?;
                Shape::Values(expr_kind(schema, Some(model), expr)?)
            }
        });
    }

    match shape {
        Some(Shape::Values(element)) => Ok(OutputType {
            cardinality,
            element,
        }),
        _ => Err(PlanError::MissingProjection),
    }
}

/// Validate a predicate against the rows of one entity.
pub fn validate_predicate(
    schema: &Schema,
    model: &'static EntityModel,
    predicate: &Predicate,
) -> Result<(), PlanError> {
    match predicate {
        Predicate::True | Predicate::False => Ok(()),
        Predicate::And(children) | Predicate::Or(children) => children
            .iter()
            .try_for_each(|child| validate_predicate(schema, model, child)),
        Predicate::Not(inner) => validate_predicate(schema, model, inner),
        Predicate::IsNull { field } => resolve_field_path(schema, model, field).map(|_| ()),
        Predicate::Compare(ComparePredicate { field, rhs, .. }) => {
            let left = resolve_field_path(schema, model, field)?;
            let right = expr_kind(schema, Some(model), rhs)?;
            if comparable(left, right) {
                Ok(())
            } else {
                Err(PlanError::IncompatibleComparison {
                    field: field.clone(),
                    left,
                    right,
                })
            }
        }
    }
}

/// Validate order keys against the rows of one entity.
pub fn validate_order(
    schema: &Schema,
    model: &'static EntityModel,
    keys: &[OrderKey],
) -> Result<(), PlanError> {
    keys.iter()
        .try_for_each(|key| expr_kind(schema, Some(model), &key.expr).map(|_| ()))
}

/// Resolve a field path (`field` or `ref_field.target_field`) to its kind.
pub fn resolve_field_path(
    schema: &Schema,
    model: &'static EntityModel,
    path: &str,
) -> Result<ValueKind, PlanError> {
    let (owner, field) = match path.split_once('.') {
        None => (model, path),
        Some((head, tail)) => {
            if tail.contains('.') {
                return Err(PlanError::PathTooDeep {
                    path: path.to_string(),
                });
            }
            (navigate_target(schema, model, head)?, tail)
        }
    };

    let Some(field_model) = owner.field(field) else {
        return Err(PlanError::UnknownField {
            entity: owner.path,
            field: field.to_string(),
        });
    };

    schema
        .value_kind(field_model.kind)
        .ok_or_else(|| PlanError::UnknownEntity {
            entity: field_model.kind.ref_target().unwrap_or_default().to_string(),
        })
}

/// Static kind of an expression in the context of an optional row entity.
pub fn expr_kind(
    schema: &Schema,
    model: Option<&'static EntityModel>,
    expr: &Expr,
) -> Result<ValueKind, PlanError> {
    match expr {
        Expr::Literal(value) => value.kind().ok_or_else(|| PlanError::UntypedExpr {
            expr: expr.to_string(),
        }),
        Expr::Field(path) => match model {
            Some(model) => resolve_field_path(schema, model, path),
            None => Err(PlanError::UntypedExpr {
                expr: expr.to_string(),
            }),
        },
        Expr::Outer(outer) => {
            let outer_model = entity_model(schema, outer.entity.as_str())?;
            resolve_field_path(schema, outer_model, outer.field)
        }
        Expr::Param(param) => Err(PlanError::UnboundParameter {
            param: param.to_string(),
        }),
        Expr::Session(key) => Err(PlanError::SessionState { key: key.clone() }),
        Expr::Concat(parts) => {
            for part in parts {
                expr_kind(schema, model, part)?;
            }
            Ok(ValueKind::Text)
        }
    }
}

fn entity_model(schema: &Schema, path: &str) -> Result<&'static EntityModel, PlanError> {
    schema
        .entity_by_path(path)
        .ok_or_else(|| PlanError::UnknownEntity {
            entity: path.to_string(),
        })
}

fn navigate_target(
    schema: &Schema,
    model: &'static EntityModel,
    field: &str,
) -> Result<&'static EntityModel, PlanError> {
    let Some(field_model) = model.field(field) else {
        return Err(PlanError::UnknownField {
            entity: model.path,
            field: field.to_string(),
        });
    };
    let Some(target) = field_model.kind.ref_target() else {
        return Err(PlanError::NotAReference {
            entity: model.path,
            field: field.to_string(),
        });
    };

    entity_model(schema, target)
}

fn rows(shape: Option<Shape>, op: &'static str) -> Result<&'static EntityModel, PlanError> {
    match shape {
        Some(Shape::Rows(model)) => Ok(model),
        _ => Err(PlanError::RowOperatorAfterProjection { op }),
    }
}

const fn comparable(left: ValueKind, right: ValueKind) -> bool {
    matches!(
        (left, right),
        (ValueKind::Int | ValueKind::Uint, ValueKind::Int | ValueKind::Uint)
            | (ValueKind::Bool, ValueKind::Bool)
            | (ValueKind::Text, ValueKind::Text)
            | (ValueKind::Timestamp, ValueKind::Timestamp)
    )
}
