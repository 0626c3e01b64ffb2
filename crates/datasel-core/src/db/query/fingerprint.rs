//! Deterministic fingerprinting of composed report queries.
#![allow(clippy::cast_possible_truncation)]

use crate::{
    db::query::{
        compose::ComposedQuery,
        expr::Expr,
        plan::{Cardinality, OrderDirection, OrderKey, OutputType, PlanNode},
        predicate::Predicate,
    },
    value::{Value, ValueKind},
};
use sha2::{Digest, Sha256};
use std::fmt;

///
/// QueryFingerprint
///
/// Stable fingerprint of a composed query. Two compositions of the same
/// definition over the same schema hash identically.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QueryFingerprint([u8; 32]);

impl QueryFingerprint {
    #[must_use]
    pub fn of(query: &ComposedQuery) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"queryfp:v2");

        let base = query.base();
        write_tag(&mut hasher, 0x01);
        write_str(&mut hasher, base.entity().as_str());
        write_str(&mut hasher, query.outer().field);

        write_tag(&mut hasher, 0x02);
        write_u32(&mut hasher, base.column_names().len() as u32);
        for column in base.column_names() {
            write_str(&mut hasher, column);
        }

        write_tag(&mut hasher, 0x03);
        match base.predicate() {
            Some(predicate) => write_predicate(&mut hasher, predicate),
            None => write_tag(&mut hasher, 0x00),
        }

        write_tag(&mut hasher, 0x04);
        write_u32(&mut hasher, base.order().len() as u32);
        for key in base.order() {
            write_order_key(&mut hasher, key);
        }

        write_tag(&mut hasher, 0x05);
        write_u32(&mut hasher, query.columns().len() as u32);
        for column in query.columns() {
            write_str(&mut hasher, column.name());
            write_str(&mut hasher, column.plugin().as_str());
            write_output(&mut hasher, column.output());
            write_plan(&mut hasher, column.fragment().plan());
        }

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        Self(out)
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

// Structured encoders. Every variant writes a distinct tag and every
// variable-length part is length-prefixed, so distinct trees never share
// an encoding.

fn write_plan(hasher: &mut Sha256, node: &PlanNode) {
    match node {
        PlanNode::Scan { entity } => {
            write_tag(hasher, 0x20);
            write_str(hasher, entity.as_str());
        }
        PlanNode::Filter { input, predicate } => {
            write_plan(hasher, input);
            write_tag(hasher, 0x21);
            write_predicate(hasher, predicate);
        }
        PlanNode::OrderBy { input, keys } => {
            write_plan(hasher, input);
            write_tag(hasher, 0x22);
            write_u32(hasher, keys.len() as u32);
            for key in keys {
                write_order_key(hasher, key);
            }
        }
        PlanNode::Take { input, count } => {
            write_plan(hasher, input);
            write_tag(hasher, 0x23);
            write_u32(hasher, *count);
        }
        PlanNode::Navigate { input, field } => {
            write_plan(hasher, input);
            write_tag(hasher, 0x24);
            write_str(hasher, field);
        }
        PlanNode::Project { input, expr } => {
            write_plan(hasher, input);
            write_tag(hasher, 0x25);
            write_expr(hasher, expr);
        }
    }
}

fn write_predicate(hasher: &mut Sha256, predicate: &Predicate) {
    match predicate {
        Predicate::True => write_tag(hasher, 0x30),
        Predicate::False => write_tag(hasher, 0x31),
        Predicate::And(preds) => write_predicate_group(hasher, 0x32, preds),
        Predicate::Or(preds) => write_predicate_group(hasher, 0x33, preds),
        Predicate::Not(inner) => {
            write_tag(hasher, 0x34);
            write_predicate(hasher, inner);
        }
        Predicate::Compare(cmp) => {
            write_tag(hasher, 0x35);
            write_str(hasher, &cmp.field);
            write_tag(hasher, cmp.op.tag());
            write_expr(hasher, &cmp.rhs);
        }
        Predicate::IsNull { field } => {
            write_tag(hasher, 0x36);
            write_str(hasher, field);
        }
    }
}

fn write_predicate_group(hasher: &mut Sha256, tag: u8, preds: &[Predicate]) {
    write_tag(hasher, tag);
    write_u32(hasher, preds.len() as u32);
    for pred in preds {
        write_predicate(hasher, pred);
    }
}

fn write_order_key(hasher: &mut Sha256, key: &OrderKey) {
    write_expr(hasher, &key.expr);
    write_tag(
        hasher,
        match key.direction {
            OrderDirection::Asc => 0x01,
            OrderDirection::Desc => 0x02,
        },
    );
}

fn write_expr(hasher: &mut Sha256, expr: &Expr) {
    match expr {
        Expr::Literal(value) => {
            write_tag(hasher, 0x40);
            write_value(hasher, value);
        }
        Expr::Field(name) => {
            write_tag(hasher, 0x41);
            write_str(hasher, name);
        }
        Expr::Param(param) => {
            write_tag(hasher, 0x42);
            write_str(hasher, param.as_str());
        }
        Expr::Outer(outer) => {
            write_tag(hasher, 0x43);
            write_str(hasher, outer.entity.as_str());
            write_str(hasher, outer.field);
        }
        Expr::Session(key) => {
            write_tag(hasher, 0x44);
            write_str(hasher, key);
        }
        Expr::Concat(parts) => {
            write_tag(hasher, 0x45);
            write_u32(hasher, parts.len() as u32);
            for part in parts {
                write_expr(hasher, part);
            }
        }
    }
}

fn write_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => write_tag(hasher, 0x50),
        Value::Bool(v) => {
            write_tag(hasher, 0x51);
            write_tag(hasher, u8::from(*v));
        }
        Value::Int(v) => {
            write_tag(hasher, 0x52);
            hasher.update(v.to_be_bytes());
        }
        Value::Uint(v) => {
            write_tag(hasher, 0x53);
            hasher.update(v.to_be_bytes());
        }
        Value::Text(v) => {
            write_tag(hasher, 0x54);
            write_str(hasher, v);
        }
        Value::Timestamp(v) => {
            write_tag(hasher, 0x55);
            hasher.update(v.timestamp_micros().to_be_bytes());
        }
        Value::List(items) => {
            write_tag(hasher, 0x56);
            write_u32(hasher, items.len() as u32);
            for item in items {
                write_value(hasher, item);
            }
        }
    }
}

fn write_output(hasher: &mut Sha256, output: OutputType) {
    write_tag(
        hasher,
        match output.cardinality {
            Cardinality::Scalar => 0x01,
            Cardinality::Sequence => 0x02,
        },
    );
    write_tag(
        hasher,
        match output.element {
            ValueKind::Bool => 0x01,
            ValueKind::Int => 0x02,
            ValueKind::Uint => 0x03,
            ValueKind::Text => 0x04,
            ValueKind::Timestamp => 0x05,
        },
    );
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}
