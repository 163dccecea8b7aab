//! Integration tests - translate query files against a YAML entity model
//!
//! These tests only use the public API: model loading, query parsing,
//! configuration, and `translate_to_sql`.

mod model_file_tests;
mod query_file_tests;

use entsql::entity_catalog::{load_entity_model, EntityModel};
use std::io::Write;

pub const BLOG_MODEL: &str = r#"
name: blogging
entities:
  - name: Blog
    table: Blogs
    key: BlogId
    properties: [BlogId, Url, Name, UserId]
    navigations:
      - { name: User, target: User, source_column: UserId, target_column: UserId, required: true }
      - { name: Posts, target: Post, source_column: BlogId, target_column: BlogId, collection: true }
  - name: Post
    table: Posts
    key: PostId
    properties: [PostId, Title, Content, BlogId, UserId, LikeCount]
    navigations:
      - { name: Blog, target: Blog, source_column: BlogId, target_column: BlogId }
      - { name: User, target: User, source_column: UserId, target_column: UserId, required: true }
  - name: User
    table: Users
    key: UserId
    properties: [UserId, { name: UserName, column: user_name }]
"#;

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

pub fn blog_model() -> EntityModel {
    let file = write_temp(BLOG_MODEL, ".yaml");
    load_entity_model(file.path()).unwrap()
}

pub fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
}
