use crate::db::query::expr::Expr;
use std::{
    fmt,
    ops::{BitAnd, BitOr},
};

///
/// Predicate AST
///
/// Pure, schema-agnostic representation of row filters. Field names may
/// address one reference hop with a dotted path (`note_type_id.entity_type`).
/// All interpretation occurs in later passes:
///
/// - validation (schema-aware)
/// - correlation closing
/// - execution
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Lte = 0x04,
    Gt = 0x05,
    Gte = 0x06,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

///
/// ComparePredicate
///
/// `field <op> rhs`, where `rhs` may be a literal, another field, or a
/// correlation reference.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub field: String,
    pub op: CompareOp,
    pub rhs: Expr,
}

impl ComparePredicate {
    #[must_use]
    pub fn new(field: impl Into<String>, op: CompareOp, rhs: Expr) -> Self {
        Self {
            field: field.into(),
            op,
            rhs,
        }
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
    IsNull { field: String },
}

impl Predicate {
    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(pred: Self) -> Self {
        Self::Not(Box::new(pred))
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Eq, rhs))
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Ne, rhs))
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Lt, rhs))
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Lte, rhs))
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Gt, rhs))
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, rhs: Expr) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Gte, rhs))
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    /// Visit every field path referenced by this predicate.
    pub fn visit_fields(&self, f: &mut impl FnMut(&str)) {
        match self {
            Self::True | Self::False => {}
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.visit_fields(f);
                }
            }
            Self::Not(inner) => inner.visit_fields(f),
            Self::Compare(cmp) => f(&cmp.field),
            Self::IsNull { field } => f(field),
        }
    }

    /// Visit every right-hand-side expression of this predicate.
    pub fn visit_exprs(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Self::True | Self::False | Self::IsNull { .. } => {}
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.visit_exprs(f);
                }
            }
            Self::Not(inner) => inner.visit_exprs(f),
            Self::Compare(cmp) => cmp.rhs.visit(f),
        }
    }

    /// Rebuild every right-hand-side expression through `f`.
    #[must_use]
    pub fn rewrite_exprs(self, f: &mut impl FnMut(Expr) -> Expr) -> Self {
        match self {
            Self::And(children) => {
                Self::And(children.into_iter().map(|c| c.rewrite_exprs(f)).collect())
            }
            Self::Or(children) => {
                Self::Or(children.into_iter().map(|c| c.rewrite_exprs(f)).collect())
            }
            Self::Not(inner) => Self::Not(Box::new(inner.rewrite_exprs(f))),
            Self::Compare(cmp) => Self::Compare(ComparePredicate {
                rhs: cmp.rhs.rewrite(f),
                ..cmp
            }),
            other => other,
        }
    }
}

// Flatten nested conjunctions so builder chains stay one level deep.
impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::And(children) => join(f, children, " and "),
            Self::Or(children) => join(f, children, " or "),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::Compare(cmp) => write!(f, "{} {} {}", cmp.field, cmp.op.symbol(), cmp.rhs),
            Self::IsNull { field } => write!(f, "{field} is null"),
        }
    }
}
