//! End-to-end translation tests: operator chain to relational plan to SQL.

use crate::config::{FlattenPolicy, TranslatorConfig};
use crate::entity_catalog::{EntityModel, EntitySchema};
use crate::query_planner::logical_plan::QueryChain;
use crate::render_plan::errors::TranslationError;
use crate::render_plan::{translate, Scope};
use crate::sql_generator::{generate_sql, Dialect};

mod group_by_tests;

pub(super) fn blog_model() -> EntityModel {
    EntityModel::new()
        .with_entity(
            EntitySchema::new("Blog", "Blogs", "BlogId")
                .with_property("BlogId")
                .with_property("Url")
                .with_property("Name")
                .with_property("UserId")
                .with_reference("User", "User", "UserId", "UserId", true)
                .with_collection("Posts", "Post", "BlogId", "BlogId"),
        )
        .with_entity(
            EntitySchema::new("Post", "Posts", "PostId")
                .with_property("PostId")
                .with_property("Title")
                .with_property("Content")
                .with_property("BlogId")
                .with_property("UserId")
                .with_property("LikeCount")
                .with_reference("Blog", "Blog", "BlogId", "BlogId", false)
                .with_reference("User", "User", "UserId", "UserId", true),
        )
        .with_entity(
            EntitySchema::new("User", "Users", "UserId")
                .with_property("UserId")
                .with_property("UserName"),
        )
}

pub(super) fn plan(chain: &QueryChain, policy: FlattenPolicy) -> Result<Scope, TranslationError> {
    translate(chain, &blog_model(), policy)
}

pub(super) fn sql_in(chain: &QueryChain, dialect: Dialect, policy: FlattenPolicy) -> String {
    let scope = plan(chain, policy).unwrap();
    let config = TranslatorConfig {
        dialect,
        flatten_policy: policy,
        ..Default::default()
    };
    generate_sql(&scope, &config)
}

/// SQL in the default (quoted) dialect with the conservative policy
pub(super) fn sql(chain: &QueryChain) -> String {
    sql_in(chain, Dialect::Quoted, FlattenPolicy::Conservative)
}

pub(super) fn translate_err(chain: &QueryChain) -> TranslationError {
    plan(chain, FlattenPolicy::Conservative).unwrap_err()
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
}

/// Compare SQL ignoring layout whitespace
pub(super) fn assert_sql(actual: &str, expected: &str) {
    assert_eq!(normalize(actual), normalize(expected), "\nactual SQL:\n{}", actual);
}
