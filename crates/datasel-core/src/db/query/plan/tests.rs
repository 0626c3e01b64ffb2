use super::*;
use crate::{
    db::query::{
        expr::{Expr, OuterRef},
        fragment::InnerQuery,
        predicate::Predicate,
    },
    test_fixtures::{COMMENT, OWNER, schema},
    value::ValueKind,
};

fn closed_comments() -> InnerQuery {
    InnerQuery::scan(COMMENT.type_id(), "outer")
        .filter(Predicate::eq("owner_id", Expr::from(OuterRef::identity(&OWNER))))
}

fn infer(inner: &InnerQuery) -> Result<OutputType, PlanError> {
    infer_output(&schema(), inner.plan(), inner.cardinality())
}

#[test]
fn infer_follows_navigation_to_the_projected_field() {
    let inner = closed_comments()
        .navigate("alias_id")
        .navigate("author_id")
        .project(Expr::field("display_name"));

    assert_eq!(infer(&inner), Ok(OutputType::sequence_of(ValueKind::Text)));
}

#[test]
fn infer_types_concat_as_text_and_refs_as_target_keys() {
    let concat = closed_comments().project(Expr::concat(vec![
        Expr::field("body"),
        Expr::text(" #"),
        Expr::field("id"),
    ]));
    assert_eq!(infer(&concat), Ok(OutputType::sequence_of(ValueKind::Text)));

    let reference = closed_comments().project(Expr::field("alias_id")).scalar();
    assert_eq!(infer(&reference), Ok(OutputType::scalar(ValueKind::Int)));
}

#[test]
fn dotted_paths_resolve_one_reference_hop() {
    let schema = schema();

    assert_eq!(
        resolve_field_path(&schema, &COMMENT, "alias_id.author_id"),
        Ok(ValueKind::Int)
    );
    assert_eq!(
        resolve_field_path(&schema, &COMMENT, "alias_id.author_id.display_name"),
        Err(PlanError::PathTooDeep {
            path: "alias_id.author_id.display_name".to_string(),
        })
    );
    assert_eq!(
        resolve_field_path(&schema, &COMMENT, "body.length"),
        Err(PlanError::NotAReference {
            entity: "fixtures::Comment",
            field: "body".to_string(),
        })
    );
}

#[test]
fn row_operators_after_projection_are_rejected() {
    let inner = closed_comments()
        .project(Expr::field("body"))
        .order_by(vec![OrderKey::desc("posted_at")]);

    assert_eq!(
        infer(&inner),
        Err(PlanError::RowOperatorAfterProjection { op: "order_by" })
    );
}

#[test]
fn take_is_allowed_on_either_side_of_projection() {
    let before = closed_comments().take(2).project(Expr::field("body"));
    let after = closed_comments().project(Expr::field("body")).take(2);

    assert!(infer(&before).is_ok());
    assert!(infer(&after).is_ok());
}

#[test]
fn plans_must_end_in_a_projection() {
    assert_eq!(infer(&closed_comments()), Err(PlanError::MissingProjection));
}

#[test]
fn comparisons_must_be_kind_compatible() {
    let inner = InnerQuery::scan(COMMENT.type_id(), "outer")
        .filter(Predicate::eq("hidden", Expr::text("no")))
        .project(Expr::field("body"));

    assert_eq!(
        infer(&inner),
        Err(PlanError::IncompatibleComparison {
            field: "hidden".to_string(),
            left: ValueKind::Bool,
            right: ValueKind::Text,
        })
    );
}

#[test]
fn free_parameters_and_session_reads_fail_validation() {
    let open = InnerQuery::scan(COMMENT.type_id(), "outer")
        .filter(Predicate::eq("owner_id", Expr::param("outer")))
        .project(Expr::field("body"));
    assert_eq!(
        infer(&open),
        Err(PlanError::UnboundParameter {
            param: "outer".to_string(),
        })
    );

    let session = closed_comments().project(Expr::session("locale"));
    assert_eq!(
        infer(&session),
        Err(PlanError::SessionState {
            key: "locale".to_string(),
        })
    );
}

#[test]
fn walkers_count_distinct_and_total_references() {
    let inner = InnerQuery::scan(COMMENT.type_id(), "outer")
        .filter(
            Predicate::eq("owner_id", Expr::param("outer"))
                & Predicate::eq("kind", Expr::param("outer")),
        )
        .project(Expr::concat(vec![Expr::field("body"), Expr::session("suffix")]));

    let plan = inner.plan();
    assert_eq!(plan.param_refs(), 2);
    assert_eq!(plan.free_params().len(), 1);
    assert_eq!(plan.session_refs(), ["suffix"]);
    assert_eq!(plan.source_entity(), COMMENT.type_id());
}
