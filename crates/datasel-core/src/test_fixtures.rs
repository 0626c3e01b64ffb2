//! Shared test entities, seeded store, and a small column plugin.
//!
//! Owner ← Comment → AuthorAlias → Author mirrors the shape of real
//! annotation data: per-owner comments with one alias hop to the author.

use crate::{
    DEFAULT_CORRELATION_PARAM,
    db::{
        query::{
            expr::{Expr, ParamName},
            fragment::InnerQuery,
            plan::{OrderKey, OutputType},
            predicate::Predicate,
        },
        store::MemoryStore,
    },
    model::{EntityFieldModel, EntityModel, FieldKind, Schema},
    plugin::{
        ColumnPlugin, ConfigFormatError, InputDescriptor, PluginDescriptor, PluginId,
        count_or_default, join_fields, optional_int, split_fields,
    },
    render,
    value::{Value, ValueKind},
};
use chrono::{DateTime, TimeZone, Utc};

pub(crate) static OWNER: EntityModel = EntityModel {
    path: "fixtures::Owner",
    entity_name: "Owner",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("name", FieldKind::Text),
    ],
};

pub(crate) static AUTHOR: EntityModel = EntityModel {
    path: "fixtures::Author",
    entity_name: "Author",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("display_name", FieldKind::Text),
    ],
};

pub(crate) static AUTHOR_ALIAS: EntityModel = EntityModel {
    path: "fixtures::AuthorAlias",
    entity_name: "AuthorAlias",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new(
            "author_id",
            FieldKind::Ref {
                target: "fixtures::Author",
            },
        ),
    ],
};

pub(crate) static COMMENT: EntityModel = EntityModel {
    path: "fixtures::Comment",
    entity_name: "Comment",
    primary_key: "id",
    fields: &[
        EntityFieldModel::new("id", FieldKind::Int),
        EntityFieldModel::new("owner_id", FieldKind::Int),
        EntityFieldModel::new(
            "alias_id",
            FieldKind::Ref {
                target: "fixtures::AuthorAlias",
            },
        ),
        EntityFieldModel::new("hidden", FieldKind::Bool),
        EntityFieldModel::new("posted_at", FieldKind::Timestamp),
        EntityFieldModel::new("kind", FieldKind::Int),
        EntityFieldModel::new("body", FieldKind::Text),
    ],
};

pub(crate) fn schema() -> Schema {
    Schema::from_models(&[&OWNER, &AUTHOR, &AUTHOR_ALIAS, &COMMENT]).expect("fixture schema")
}

/// 2024-03-01 at `hour`:00 UTC.
pub(crate) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Seeded data, per owner (visible comments, newest first):
///
/// owner 1: 105 (13h, alias 13 → missing author), 101 (11h, Ben),
///          106 (11h, Ben), 100 (9h, Ann), 103 (8h, Cy, kind 2);
///          102 (12h, Cy) is hidden
/// owner 2: 104 (10h, Ann)
/// owner 3: none
pub(crate) fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::for_schema(&schema());

    for (id, name) in [(1, "Pat"), (2, "Sam"), (3, "Lou")] {
        store
            .insert(
                OWNER.type_id(),
                [("id", Value::Int(id)), ("name", Value::from(name))],
            )
            .expect("owner");
    }
    for (id, name) in [(1, "Ann"), (2, "Ben"), (3, "Cy")] {
        store
            .insert(
                AUTHOR.type_id(),
                [("id", Value::Int(id)), ("display_name", Value::from(name))],
            )
            .expect("author");
    }
    for (id, author) in [(10, 1), (11, 2), (12, 3), (13, 99)] {
        store
            .insert(
                AUTHOR_ALIAS.type_id(),
                [("id", Value::Int(id)), ("author_id", Value::Int(author))],
            )
            .expect("alias");
    }

    let comments: [(i64, i64, i64, bool, u32, i64); 7] = [
        (100, 1, 10, false, 9, 1),
        (101, 1, 11, false, 11, 1),
        (102, 1, 12, true, 12, 1),
        (103, 1, 12, false, 8, 2),
        (104, 2, 10, false, 10, 1),
        (105, 1, 13, false, 13, 1),
        (106, 1, 11, false, 11, 1),
    ];
    for (id, owner, alias, hidden, hour, kind) in comments {
        store
            .insert(
                COMMENT.type_id(),
                [
                    ("id", Value::Int(id)),
                    ("owner_id", Value::Int(owner)),
                    ("alias_id", Value::Int(alias)),
                    ("hidden", Value::Bool(hidden)),
                    ("posted_at", Value::Timestamp(at(hour))),
                    ("kind", Value::Int(kind)),
                    ("body", Value::from(format!("comment {id}"))),
                ],
            )
            .expect("comment");
    }

    store
}

/// Visible comment authors for the correlated owner, newest first.
pub(crate) fn recent_authors(param: &ParamName, kind: Option<i64>, count: u32) -> InnerQuery {
    let mut predicate = Predicate::eq("owner_id", Expr::Param(param.clone()))
        & Predicate::eq("hidden", Expr::literal(false));
    if let Some(kind) = kind {
        predicate = predicate & Predicate::eq("kind", Expr::literal(kind));
    }

    InnerQuery::scan(COMMENT.type_id(), param.clone())
        .filter(predicate)
        .order_by(vec![OrderKey::desc("posted_at"), OrderKey::asc("id")])
        .navigate("alias_id")
        .navigate("author_id")
        .project(Expr::field("display_name"))
        .take(count)
}

pub(crate) fn default_param() -> ParamName {
    ParamName::new(DEFAULT_CORRELATION_PARAM)
}

///
/// RecentAuthors
///
/// Minimal plugin over the fixture schema: "kind|count".
///

#[derive(Clone, Debug, Default)]
pub(crate) struct RecentAuthors;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RecentAuthorsConfig {
    pub(crate) kind: Option<i64>,
    pub(crate) count: u32,
}

impl RecentAuthors {
    pub(crate) const ID: PluginId = PluginId::new("fixtures::RecentAuthors");
}

impl ColumnPlugin for RecentAuthors {
    type Config = RecentAuthorsConfig;

    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: Self::ID,
            title: "Recent Authors",
            column_name: "Recent Authors",
            header: "Recent Authors",
            applies_to: OWNER.type_id(),
            output: OutputType::sequence_of(ValueKind::Text),
        }
    }

    fn parse_config(&self, raw: &str) -> Result<Self::Config, ConfigFormatError> {
        let fields = split_fields(Self::ID, raw, 2)?;

        Ok(RecentAuthorsConfig {
            kind: optional_int(&fields, 0),
            count: count_or_default(Self::ID, &fields, 1, 1)?,
        })
    }

    fn serialize_config(&self, config: &Self::Config) -> String {
        let kind = config.kind.map(|k| k.to_string()).unwrap_or_default();

        join_fields([kind, config.count.to_string()])
    }

    fn build_fragment(&self, config: &Self::Config, param: &ParamName) -> InnerQuery {
        recent_authors(param, config.kind, config.count)
    }

    fn inputs(&self, config: &Self::Config) -> Vec<InputDescriptor> {
        vec![
            InputDescriptor::select(
                "kind",
                "Kind",
                Vec::new(),
                config.kind.map(|k| k.to_string()).unwrap_or_default(),
            ),
            InputDescriptor::integer("count", "Count", 1, 10, i64::from(config.count)),
        ]
    }

    fn format_value(&self, value: &Value) -> String {
        render::format_labeled_list(value, |i| format!("Author {i}"))
    }
}
