use super::*;
use entsql::config::{FlattenPolicy, TranslatorConfig};
use entsql::query_planner::logical_plan::{LogicalPlanError, QueryChain};
use entsql::render_plan::JoinType;
use entsql::sql_generator::Dialect;
use entsql::translate_to_sql;
use test_case::test_case;

const ANY_POST_QUERY: &str = r#"{
    "source": "Blog",
    "ops": [{
        "op": "filter",
        "param": "b",
        "predicate": {"quantifier": {
            "kind": "any",
            "collection": {"member": {"target": {"var": "b"}, "name": "Posts"}},
            "predicate": {
                "param": "p",
                "body": {"binary": {
                    "op": "not_equal",
                    "left": {"member": {"target": {"var": "p"}, "name": "Content"}},
                    "right": {"literal": "null"}
                }}
            }
        }}
    }]
}"#;

#[test_case(Dialect::Sqlite, "select b0.* from Blogs b0 left outer join (select p0.BlogId as 'BlogId_jk0' from Posts p0 where p0.Content is not null group by p0.BlogId) sq0 on b0.BlogId = sq0.BlogId_jk0 where sq0.BlogId_jk0 is not null" ; "sqlite")]
#[test_case(Dialect::Quoted, "select b0.* from Blogs b0 left outer join (select p0.'BlogId' as 'BlogId_jk0' from Posts p0 where p0.'Content' is not null group by p0.'BlogId') sq0 on b0.'BlogId' = sq0.'BlogId_jk0' where sq0.'BlogId_jk0' is not null" ; "quoted")]
#[test_case(Dialect::Mysql, "select b0.* from `Blogs` b0 left outer join (select p0.`BlogId` as `BlogId_jk0` from `Posts` p0 where p0.`Content` is not null group by p0.`BlogId`) sq0 on b0.`BlogId` = sq0.`BlogId_jk0` where sq0.`BlogId_jk0` is not null" ; "mysql")]
fn test_json_query_in_each_dialect(dialect: Dialect, expected: &str) {
    let chain = QueryChain::from_json(ANY_POST_QUERY).unwrap();
    let config = TranslatorConfig {
        dialect,
        ..Default::default()
    };
    let translation = translate_to_sql(&chain, &blog_model(), &config).unwrap();
    assert_eq!(normalize(&translation.sql), expected);
}

#[test]
fn test_plan_is_returned_with_sql() {
    let chain = QueryChain::from_json(ANY_POST_QUERY).unwrap();
    let translation =
        translate_to_sql(&chain, &blog_model(), &TranslatorConfig::default()).unwrap();
    assert_eq!(translation.plan.joins.len(), 1);
    assert_eq!(translation.plan.joins[0].join_type, JoinType::Left);

    let json = serde_json::to_value(&translation.plan).unwrap();
    assert_eq!(json["joins"][0]["alias"], "sq0");
}

#[test]
fn test_yaml_chain_with_wrap_under_both_policies() {
    let yaml = r#"
source: Post
ops:
  - op: select
    param: p
    selector: { value: { member: { target: { var: p }, name: Blog } } }
  - op: select
    param: b
    selector: { value: { member: { target: { member: { target: { var: b }, name: User } }, name: UserName } } }
"#;
    let chain = QueryChain::from_yaml(yaml).unwrap();

    let conservative =
        translate_to_sql(&chain, &blog_model(), &TranslatorConfig::default()).unwrap();
    assert_eq!(
        normalize(&conservative.sql),
        "select u0.'user_name' as 'UserName' from (select b0.'UserId' as 'UserId_jk0' from Posts p0 left outer join Blogs b0 on p0.'BlogId' = b0.'BlogId') sq0 left outer join Users u0 on sq0.'UserId_jk0' = u0.'UserId'"
    );

    let eager_config = TranslatorConfig {
        flatten_policy: FlattenPolicy::Eager,
        ..Default::default()
    };
    let eager = translate_to_sql(&chain, &blog_model(), &eager_config).unwrap();
    assert_eq!(
        normalize(&eager.sql),
        "select u0.'user_name' as 'UserName' from Posts p0 left outer join Blogs b0 on p0.'BlogId' = b0.'BlogId' left outer join Users u0 on b0.'UserId' = u0.'UserId'"
    );
}

#[test]
fn test_malformed_query_is_a_parse_error() {
    let err = QueryChain::from_json(r#"{"source": "Post", "ops": [{"op": "sort"}]}"#).unwrap_err();
    assert!(matches!(err, LogicalPlanError::Parse(_)), "{:?}", err);
}

#[test]
fn test_indent_width_is_applied() {
    let chain = QueryChain::from_json(ANY_POST_QUERY).unwrap();
    let config = TranslatorConfig {
        dialect: Dialect::Sqlite,
        indent_width: 2,
        ..Default::default()
    };
    let translation = translate_to_sql(&chain, &blog_model(), &config).unwrap();
    assert!(
        translation.sql.contains("\n  select p0.BlogId as 'BlogId_jk0'\n  from Posts p0\n"),
        "{}",
        translation.sql
    );
}
