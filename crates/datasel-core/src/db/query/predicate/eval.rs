use crate::{
    db::query::{
        expr::Expr,
        predicate::{CompareOp, ComparePredicate, Predicate},
    },
    value::{Value, compare_eq, compare_order},
};
use std::cmp::Ordering;

///
/// FieldPresence
///
/// Result of attempting to read a field from a row during evaluation.
/// Distinguishes a missing field from a present field whose value is `Null`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum FieldPresence {
    /// Field exists and has a value (including `Value::Null`).
    Present(Value),
    /// Field is not present on the row.
    Missing,
}

impl FieldPresence {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Self::Present(value) => value,
            Self::Missing => Value::Null,
        }
    }
}

///
/// Row
///
/// Abstraction over a row-like value that can expose fields by path.
/// This decouples evaluation from concrete storage.
///

pub(crate) trait Row {
    fn field(&self, path: &str) -> FieldPresence;
}

///
/// Scope
///
/// Evaluation scope: the outer row a closed fragment is correlated to.
///

#[derive(Clone, Copy, Default)]
pub(crate) struct Scope<'a> {
    pub(crate) outer: Option<&'a dyn Row>,
}

impl<'a> Scope<'a> {
    pub(crate) const fn root() -> Self {
        Self { outer: None }
    }

    pub(crate) const fn correlated(outer: &'a dyn Row) -> Self {
        Self { outer: Some(outer) }
    }
}

///
/// Evaluate a scalar expression against a row.
///
/// Unbound parameters and session reads evaluate to `Null`; the executor
/// rejects plans that still contain them before evaluation starts.
///
pub(crate) fn eval_expr<R: Row + ?Sized>(row: &R, scope: Scope<'_>, expr: &Expr) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Field(path) => row.field(path).into_value(),
        Expr::Outer(outer) => scope
            .outer
            .map_or(Value::Null, |outer_row| outer_row.field(outer.field).into_value()),
        Expr::Param(_) | Expr::Session(_) => Value::Null,
        Expr::Concat(parts) => {
            let mut out = String::new();
            for part in parts {
                out.push_str(&eval_expr(row, scope, part).to_display_text());
            }

            Value::Text(out)
        }
    }
}

///
/// Evaluate a predicate against a single row.
///
/// Pure runtime evaluation: no schema access and no validation.
/// Any comparison involving `Null` or mismatched kinds evaluates to `false`.
///
#[must_use]
pub(crate) fn eval<R: Row + ?Sized>(row: &R, scope: Scope<'_>, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::False => false,

        Predicate::And(children) => children.iter().all(|child| eval(row, scope, child)),
        Predicate::Or(children) => children.iter().any(|child| eval(row, scope, child)),
        Predicate::Not(inner) => !eval(row, scope, inner),

        Predicate::Compare(cmp) => eval_compare(row, scope, cmp),

        Predicate::IsNull { field } => {
            matches!(row.field(field), FieldPresence::Present(Value::Null))
        }
    }
}

fn eval_compare<R: Row + ?Sized>(row: &R, scope: Scope<'_>, cmp: &ComparePredicate) -> bool {
    let ComparePredicate { field, op, rhs } = cmp;

    let FieldPresence::Present(actual) = row.field(field) else {
        return false;
    };
    let expected = eval_expr(row, scope, rhs);

    match op {
        CompareOp::Eq => compare_eq(&actual, &expected).unwrap_or(false),
        CompareOp::Ne => compare_eq(&actual, &expected).is_some_and(|v| !v),
        CompareOp::Lt => compare_order(&actual, &expected).is_some_and(Ordering::is_lt),
        CompareOp::Lte => compare_order(&actual, &expected).is_some_and(Ordering::is_le),
        CompareOp::Gt => compare_order(&actual, &expected).is_some_and(Ordering::is_gt),
        CompareOp::Gte => compare_order(&actual, &expected).is_some_and(Ordering::is_ge),
    }
}
