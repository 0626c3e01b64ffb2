//! Display formatting for computed column values.

use crate::value::Value;

/// Default cell text: scalars display as-is, lists are comma joined, and
/// `Null` renders as empty text.
#[must_use]
pub fn format_value(value: &Value) -> String {
    value.to_display_text()
}

/// Render each element with a 1-based label, joined with `", "`.
///
/// A scalar is treated as a one-element list. `Null` and empty lists
/// render as empty text.
#[must_use]
pub fn format_labeled_list(value: &Value, label: impl Fn(usize) -> String) -> String {
    let items: &[Value] = match value {
        Value::Null => &[],
        Value::List(items) => items,
        scalar => std::slice::from_ref(scalar),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}: {}", label(i + 1), item.to_display_text()))
        .collect::<Vec<_>>()
        .join(", ")
}
