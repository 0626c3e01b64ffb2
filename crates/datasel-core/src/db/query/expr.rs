use crate::{
    model::{EntityModel, EntityTypeId},
    value::Value,
};
use derive_more::Display;
use std::fmt;

///
/// ParamName
///
/// Name of a free correlation parameter inside an inner query.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ParamName(String);

impl ParamName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParamName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

///
/// OuterRef
///
/// Bound reference to a field of the current outer row.
/// Produced by the extractor when it closes a correlation parameter.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OuterRef {
    pub entity: EntityTypeId,
    pub field: &'static str,
}

impl OuterRef {
    /// Reference the identity (primary key) of the outer entity.
    #[must_use]
    pub const fn identity(model: &EntityModel) -> Self {
        Self {
            entity: model.type_id(),
            field: model.primary_key,
        }
    }
}

impl fmt::Display for OuterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outer.{}", self.field)
    }
}

///
/// Expr
///
/// Scalar expression evaluated against the current row of a plan node.
///
/// `Param` is a free correlation reference and must be closed by the
/// extractor before execution. `Session` reads host state at evaluation
/// time and is never allowed inside a correlated fragment.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(String),
    Param(ParamName),
    Outer(OuterRef),
    Session(String),
    Concat(Vec<Self>),
}

impl Expr {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn param(name: impl Into<ParamName>) -> Self {
        Self::Param(name.into())
    }

    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Literal(Value::Text(value.into()))
    }

    #[must_use]
    pub fn session(key: impl Into<String>) -> Self {
        Self::Session(key.into())
    }

    #[must_use]
    pub const fn concat(parts: Vec<Self>) -> Self {
        Self::Concat(parts)
    }

    /// Visit this expression and every nested expression, parents first.
    pub fn visit(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        if let Self::Concat(parts) = self {
            for part in parts {
                part.visit(f);
            }
        }
    }

    /// Rebuild this expression bottom-up through `f`.
    #[must_use]
    pub fn rewrite(self, f: &mut impl FnMut(Self) -> Self) -> Self {
        let rebuilt = match self {
            Self::Concat(parts) => Self::Concat(parts.into_iter().map(|p| p.rewrite(f)).collect()),
            other => other,
        };

        f(rebuilt)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<OuterRef> for Expr {
    fn from(value: OuterRef) -> Self {
        Self::Outer(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Literal(value @ (Value::Timestamp(_) | Value::List(_))) => {
                write!(f, "'{}'", value.to_display_text())
            }
            Self::Literal(Value::Null) => f.write_str("null"),
            Self::Literal(value) => f.write_str(&value.to_display_text()),
            Self::Field(name) => f.write_str(name),
            Self::Param(name) => write!(f, "${name}"),
            Self::Outer(outer) => write!(f, "{outer}"),
            Self::Session(key) => write!(f, "@{key}"),
            Self::Concat(parts) => {
                f.write_str("concat(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}
