//! Query plans: the tagged-variant AST shared by inner fragments and the
//! executor, plus schema-aware validation and type inference.

mod node;
mod validate;

#[cfg(test)]
mod tests;

pub use node::{Cardinality, OrderDirection, OrderKey, OutputType, PlanNode};
pub use validate::{
    PlanError, expr_kind, infer_output, resolve_field_path, validate_order, validate_predicate,
};
