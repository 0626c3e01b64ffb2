mod ast;
pub(crate) mod eval;


pub use ast::{CompareOp, ComparePredicate, Predicate};
pub(crate) use eval::{FieldPresence, Row, Scope, eval, eval_expr};
