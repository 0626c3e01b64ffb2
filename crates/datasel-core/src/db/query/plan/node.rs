//! Pure plan-layer data types; must not embed validation or execution.

use crate::{
    db::query::{
        expr::{Expr, ParamName},
        predicate::Predicate,
    },
    model::EntityTypeId,
    value::ValueKind,
};
use derive_more::Display;
use serde::Serialize;
use std::{collections::BTreeSet, fmt};

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize)]
pub enum OrderDirection {
    #[default]
    #[display("asc")]
    Asc,
    #[display("desc")]
    Desc,
}

///
/// OrderKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub direction: OrderDirection,
}

impl OrderKey {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            expr: Expr::field(field),
            direction: OrderDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            expr: Expr::field(field),
            direction: OrderDirection::Desc,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.direction)
    }
}

///
/// Cardinality
///
/// Whether a fragment yields one value per outer row or an ordered sequence.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Cardinality {
    #[display("scalar")]
    Scalar,
    #[display("sequence")]
    Sequence,
}

///
/// OutputType
///
/// Type descriptor of a computed column: cardinality plus element kind.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[display("{cardinality}<{element}>")]
pub struct OutputType {
    pub cardinality: Cardinality,
    pub element: ValueKind,
}

impl OutputType {
    #[must_use]
    pub const fn scalar(element: ValueKind) -> Self {
        Self {
            cardinality: Cardinality::Scalar,
            element,
        }
    }

    #[must_use]
    pub const fn sequence_of(element: ValueKind) -> Self {
        Self {
            cardinality: Cardinality::Sequence,
            element,
        }
    }
}

///
/// PlanNode
///
/// Tagged-variant query plan over one source entity. Each node consumes the
/// stream produced by `input`:
///
/// Scan      → every row of the entity
/// Filter    → rows matching the predicate
/// OrderBy   → stable sort by keys
/// Take      → first `count` items
/// Navigate  → follow a reference field to the referenced row; unresolved
///             references drop the row
/// Project   → one scalar value per row; terminal for row operators
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlanNode {
    Scan {
        entity: EntityTypeId,
    },
    Filter {
        input: Box<Self>,
        predicate: Predicate,
    },
    OrderBy {
        input: Box<Self>,
        keys: Vec<OrderKey>,
    },
    Take {
        input: Box<Self>,
        count: u32,
    },
    Navigate {
        input: Box<Self>,
        field: String,
    },
    Project {
        input: Box<Self>,
        expr: Expr,
    },
}

impl PlanNode {
    #[must_use]
    pub const fn scan(entity: EntityTypeId) -> Self {
        Self::Scan { entity }
    }

    /// Borrow the input node; `None` for a scan.
    #[must_use]
    pub fn input(&self) -> Option<&Self> {
        match self {
            Self::Scan { .. } => None,
            Self::Filter { input, .. }
            | Self::OrderBy { input, .. }
            | Self::Take { input, .. }
            | Self::Navigate { input, .. }
            | Self::Project { input, .. } => Some(input),
        }
    }

    /// Nodes from the scan up to and including `self`.
    #[must_use]
    pub fn pipeline(&self) -> Vec<&Self> {
        let mut nodes = vec![self];
        let mut current = self;
        while let Some(input) = current.input() {
            nodes.push(input);
            current = input;
        }
        nodes.reverse();

        nodes
    }

    /// Entity scanned at the root of this plan.
    #[must_use]
    pub fn source_entity(&self) -> EntityTypeId {
        match self {
            Self::Scan { entity } => *entity,
            Self::Filter { input, .. }
            | Self::OrderBy { input, .. }
            | Self::Take { input, .. }
            | Self::Navigate { input, .. }
            | Self::Project { input, .. } => input.source_entity(),
        }
    }

    /// Visit every expression in this plan, including nested ones.
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        for node in self.pipeline() {
            match node {
                Self::Filter { predicate, .. } => predicate.visit_exprs(f),
                Self::OrderBy { keys, .. } => {
                    for key in keys {
                        key.expr.visit(f);
                    }
                }
                Self::Project { expr, .. } => expr.visit(f),
                Self::Scan { .. } | Self::Take { .. } | Self::Navigate { .. } => {}
            }
        }
    }

    /// Rebuild every expression in this plan bottom-up through `f`.
    #[must_use]
    pub fn rewrite_exprs(self, f: &mut impl FnMut(Expr) -> Expr) -> Self {
        match self {
            Self::Scan { entity } => Self::Scan { entity },
            Self::Filter { input, predicate } => Self::Filter {
                input: Box::new(input.rewrite_exprs(f)),
                predicate: predicate.rewrite_exprs(f),
            },
            Self::OrderBy { input, keys } => Self::OrderBy {
                input: Box::new(input.rewrite_exprs(f)),
                keys: keys
                    .into_iter()
                    .map(|key| OrderKey {
                        expr: key.expr.rewrite(f),
                        direction: key.direction,
                    })
                    .collect(),
            },
            Self::Take { input, count } => Self::Take {
                input: Box::new(input.rewrite_exprs(f)),
                count,
            },
            Self::Navigate { input, field } => Self::Navigate {
                input: Box::new(input.rewrite_exprs(f)),
                field,
            },
            Self::Project { input, expr } => Self::Project {
                input: Box::new(input.rewrite_exprs(f)),
                expr: expr.rewrite(f),
            },
        }
    }

    /// Number of free correlation references (occurrences, not distinct names).
    #[must_use]
    pub fn param_refs(&self) -> usize {
        let mut count = 0;
        self.visit_exprs(&mut |expr| {
            if matches!(expr, Expr::Param(_)) {
                count += 1;
            }
        });

        count
    }

    /// Distinct free correlation parameters referenced by this plan.
    #[must_use]
    pub fn free_params(&self) -> BTreeSet<ParamName> {
        let mut params = BTreeSet::new();
        self.visit_exprs(&mut |expr| {
            if let Expr::Param(name) = expr {
                params.insert(name.clone());
            }
        });

        params
    }

    /// Number of bound outer-row references.
    #[must_use]
    pub fn outer_refs(&self) -> usize {
        let mut count = 0;
        self.visit_exprs(&mut |expr| {
            if matches!(expr, Expr::Outer(_)) {
                count += 1;
            }
        });

        count
    }

    /// Session keys read by this plan, in first-seen order.
    #[must_use]
    pub fn session_refs(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        self.visit_exprs(&mut |expr| {
            if let Expr::Session(key) = expr
                && !keys.contains(key)
            {
                keys.push(key.clone());
            }
        });

        keys
    }
}

// Deterministic one-line pipeline rendering used by explain and fingerprints.
impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.pipeline().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" |> ")?;
            }
            match node {
                Self::Scan { entity } => write!(f, "scan({entity})")?,
                Self::Filter { predicate, .. } => write!(f, "filter({predicate})")?,
                Self::OrderBy { keys, .. } => {
                    f.write_str("order_by(")?;
                    for (k, key) in keys.iter().enumerate() {
                        if k > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{key}")?;
                    }
                    f.write_str(")")?;
                }
                Self::Take { count, .. } => write!(f, "take({count})")?,
                Self::Navigate { field, .. } => write!(f, "navigate({field})")?,
                Self::Project { expr, .. } => write!(f, "project({expr})")?,
            }
        }

        Ok(())
    }
}
