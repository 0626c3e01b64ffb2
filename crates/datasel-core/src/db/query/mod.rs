//! Query layer: expressions, predicates, plans, open fragments, the
//! correlation extractor, and the report query composer.

pub mod compose;
pub mod expr;
pub mod extract;
pub mod fingerprint;
pub mod fragment;
pub mod plan;
pub mod predicate;
pub mod sql;
