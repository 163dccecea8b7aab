use super::*;
use entsql::config::TranslatorConfig;
use entsql::entity_catalog::{EntityMetadata, EntityModelError};
use entsql::query_planner::logical_plan::QueryChain;
use entsql::render_plan::errors::TranslationError;
use entsql::translate_to_sql;

#[test]
fn test_mapped_column_flows_into_sql() {
    let model = blog_model();
    assert_eq!(model.column_of("User", "UserName").unwrap().column, "user_name");

    let chain = QueryChain::from_yaml(
        r#"
source: Post
ops:
  - op: select
    param: p
    selector:
      record:
        - name: Author
          expr: { member: { target: { member: { target: { var: p }, name: User } }, name: UserName } }
"#,
    )
    .unwrap();
    let translation = translate_to_sql(&chain, &model, &TranslatorConfig::default()).unwrap();
    assert_eq!(
        normalize(&translation.sql),
        "select u0.'user_name' as 'Author' from Posts p0 left outer join Users u0 on p0.'UserId' = u0.'UserId'"
    );
}

#[test]
fn test_dangling_navigation_target_fails_to_load() {
    let yaml = r#"
entities:
  - name: Post
    table: Posts
    key: PostId
    properties: [PostId, BlogId]
    navigations:
      - { name: Blog, target: Blog, source_column: BlogId, target_column: BlogId }
"#;
    let file = write_temp(yaml, ".yaml");
    let err = load_entity_model(file.path()).unwrap_err();
    assert!(matches!(err, EntityModelError::InvalidConfig { .. }), "{:?}", err);
}

#[test]
fn test_unknown_navigation_is_reported_with_path() -> anyhow::Result<()> {
    let model = blog_model();
    let chain = QueryChain::from_json(
        r#"{
            "source": "Post",
            "ops": [{
                "op": "filter",
                "param": "p",
                "predicate": {"quantifier": {
                    "kind": "any",
                    "collection": {"member": {"target": {"var": "p"}, "name": "Comments"}}
                }}
            }]
        }"#,
    )?;
    let err = translate_to_sql(&chain, &model, &TranslatorConfig::default()).unwrap_err();
    assert_eq!(
        err,
        TranslationError::UnknownNavigation {
            entity: "Post".to_string(),
            navigation: "Comments".to_string(),
            path: "p.Comments".to_string(),
        }
    );
    Ok(())
}

#[test]
fn test_unknown_property_at_end_of_path_stays_a_property() {
    let chain = QueryChain::from_yaml(
        r#"
source: Post
ops:
  - op: select
    param: p
    selector: { value: { member: { target: { member: { target: { var: p }, name: Blog } }, name: Title } } }
"#,
    )
    .unwrap();
    let err = translate_to_sql(&chain, &blog_model(), &TranslatorConfig::default()).unwrap_err();
    assert_eq!(
        err,
        TranslationError::UnknownProperty {
            entity: "Blog".to_string(),
            property: "Title".to_string(),
            path: "p.Blog.Title".to_string(),
        }
    );
}
