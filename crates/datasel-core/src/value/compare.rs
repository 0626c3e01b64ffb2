use crate::value::Value;
use std::cmp::Ordering;

// Widen integer payloads so Int and Uint compare numerically.
fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Int(n) => Some(i128::from(*n)),
        Value::Uint(n) => Some(i128::from(*n)),
        _ => None,
    }
}

///
/// Compare two values for predicate ordering.
///
/// Returns `None` when either side is `Null` or the kinds are not comparable;
/// callers treat that as a non-match.
///
#[must_use]
pub(crate) fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => Some(a.cmp(b)),
        _ => match (as_i128(left), as_i128(right)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
    }
}

/// Equality under predicate semantics; `None` when not comparable.
#[must_use]
pub(crate) fn compare_eq(left: &Value, right: &Value) -> Option<bool> {
    compare_order(left, right).map(Ordering::is_eq)
}
