//! Correlation closing: turns an open inner query into a fragment that can be
//! spliced into the outer query as a projected column.
//!
//! The pass is purely structural. Every occurrence of the fragment's single
//! free parameter is replaced with a bound reference to the outer row's
//! identity; ordering and limit nodes are kept in place so a backend can run
//! the fragment as a correlated sub-select.

use crate::{
    db::query::{
        expr::{Expr, OuterRef, ParamName},
        fragment::InnerQuery,
        plan::{Cardinality, OutputType, PlanError, PlanNode, infer_output},
    },
    model::Schema,
};
use thiserror::Error as ThisError;

///
/// NonCorrelatedFragment
///
/// The inner query does not have exactly one free correlation parameter, or
/// it reads state that is not part of the query. Indicates a plugin bug.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("non-correlated fragment: {reason}")]
pub struct NonCorrelatedFragment {
    pub reason: NonCorrelatedReason,
}

///
/// NonCorrelatedReason
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum NonCorrelatedReason {
    #[error("no free correlation parameter")]
    NoFreeVariable,

    #[error("multiple free parameters ({})", join_params(.params))]
    MultipleFreeVariables { params: Vec<ParamName> },

    #[error("expected free parameter '{expected}', found '{found}'")]
    UnexpectedParameter {
        expected: ParamName,
        found: ParamName,
    },

    #[error("reads external state '{key}'")]
    ExternalState { key: String },
}

fn join_params(params: &[ParamName]) -> String {
    params
        .iter()
        .map(ParamName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<NonCorrelatedReason> for NonCorrelatedFragment {
    fn from(reason: NonCorrelatedReason) -> Self {
        Self { reason }
    }
}

///
/// ClosedFragment
///
/// A correlated sub-computation with no free parameters. Its only link to the
/// outside is `outer`, the identity of the row it is evaluated against.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClosedFragment {
    plan: PlanNode,
    cardinality: Cardinality,
    outer: OuterRef,
    substitutions: usize,
}

impl ClosedFragment {
    #[must_use]
    pub const fn plan(&self) -> &PlanNode {
        &self.plan
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    #[must_use]
    pub const fn outer(&self) -> OuterRef {
        self.outer
    }

    /// Number of parameter occurrences replaced while closing.
    #[must_use]
    pub const fn substitutions(&self) -> usize {
        self.substitutions
    }

    /// Remaining free references; always zero for a closed fragment.
    #[must_use]
    pub fn param_refs(&self) -> usize {
        self.plan.param_refs()
    }

    /// Infer and validate the fragment's output type.
    pub fn output(&self, schema: &Schema) -> Result<OutputType, PlanError> {
        infer_output(schema, &self.plan, self.cardinality)
    }
}

///
/// Close an inner query over the outer row identity.
///
/// Fails when the plan has zero or several distinct free parameters, when the
/// only free parameter is not the declared one, or when it reads session state.
///
pub fn extract(
    inner: InnerQuery,
    outer: OuterRef,
) -> Result<ClosedFragment, NonCorrelatedFragment> {
    let (param, plan, cardinality) = inner.into_parts();

    if let Some(key) = plan.session_refs().into_iter().next() {
        return Err(NonCorrelatedReason::ExternalState { key }.into());
    }

    let free = plan.free_params();
    match free.len() {
        0 => return Err(NonCorrelatedReason::NoFreeVariable.into()),
        1 => {
            if let Some(found) = free.into_iter().next()
                && found != param
            {
                return Err(NonCorrelatedReason::UnexpectedParameter {
                    expected: param,
                    found,
                }
                .into());
            }
        }
        _ => {
            return Err(NonCorrelatedReason::MultipleFreeVariables {
                params: free.into_iter().collect(),
            }
            .into());
        }
    }

    let mut substitutions = 0;
    let plan = plan.rewrite_exprs(&mut |expr| match expr {
        Expr::Param(name) if name == param => {
            substitutions += 1;
            Expr::Outer(outer)
        }
        other => other,
    });
    debug_assert_eq!(plan.param_refs(), 0, "closed fragment must have no free refs");

    tracing::debug!(
        param = %param,
        outer = %outer,
        substitutions,
        plan = %plan,
        "closed correlated fragment",
    );

    Ok(ClosedFragment {
        plan,
        cardinality,
        outer,
        substitutions,
    })
}
