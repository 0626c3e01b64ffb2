use crate::{
    db::query::{
        expr::{Expr, ParamName},
        plan::{Cardinality, OrderKey, PlanNode},
        predicate::Predicate,
    },
    model::EntityTypeId,
};

///
/// InnerQuery
///
/// An open query fragment: a plan over one entity expressed against a free
/// correlation parameter that stands for "the current outer row's identity".
/// Built by column plugins and closed by the extractor.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InnerQuery {
    param: ParamName,
    plan: PlanNode,
    cardinality: Cardinality,
}

impl InnerQuery {
    /// Start a sequence-valued fragment scanning `entity`.
    #[must_use]
    pub fn scan(entity: EntityTypeId, param: impl Into<ParamName>) -> Self {
        Self {
            param: param.into(),
            plan: PlanNode::scan(entity),
            cardinality: Cardinality::Sequence,
        }
    }

    /// Wrap an existing plan.
    #[must_use]
    pub fn from_plan(
        param: impl Into<ParamName>,
        plan: PlanNode,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            param: param.into(),
            plan,
            cardinality,
        }
    }

    #[must_use]
    pub fn filter(self, predicate: Predicate) -> Self {
        self.wrap(|input| PlanNode::Filter { input, predicate })
    }

    #[must_use]
    pub fn order_by(self, keys: Vec<OrderKey>) -> Self {
        self.wrap(|input| PlanNode::OrderBy { input, keys })
    }

    #[must_use]
    pub fn take(self, count: u32) -> Self {
        self.wrap(|input| PlanNode::Take { input, count })
    }

    #[must_use]
    pub fn navigate(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.wrap(|input| PlanNode::Navigate { input, field })
    }

    #[must_use]
    pub fn project(self, expr: Expr) -> Self {
        self.wrap(|input| PlanNode::Project { input, expr })
    }

    /// Yield the first value per outer row instead of a sequence.
    #[must_use]
    pub const fn scalar(mut self) -> Self {
        self.cardinality = Cardinality::Scalar;
        self
    }

    #[must_use]
    pub const fn param(&self) -> &ParamName {
        &self.param
    }

    #[must_use]
    pub const fn plan(&self) -> &PlanNode {
        &self.plan
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    #[must_use]
    pub fn into_parts(self) -> (ParamName, PlanNode, Cardinality) {
        (self.param, self.plan, self.cardinality)
    }

    fn wrap(self, f: impl FnOnce(Box<PlanNode>) -> PlanNode) -> Self {
        Self {
            plan: f(Box::new(self.plan)),
            ..self
        }
    }
}
