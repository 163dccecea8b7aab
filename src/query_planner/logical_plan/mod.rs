//! Operator chain AST.
//!
//! A query is a source entity type followed by operators applied left to
//! right, mirroring the host-language method chain
//! (`db.Posts.Where(..).Select(..).GroupBy(..)`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query_planner::logical_expr::Expr;

pub mod errors;

pub use errors::LogicalPlanError;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QueryChain {
    /// Entity type the chain starts from
    pub source: String,
    #[serde(default)]
    pub ops: Vec<QueryOp>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryOp {
    Filter {
        param: String,
        predicate: Expr,
    },
    Select {
        param: String,
        selector: Selector,
    },
    GroupBy {
        param: String,
        key: Selector,
    },
    Join {
        inner: Box<QueryChain>,
        outer_param: String,
        inner_param: String,
        condition: Expr,
        result: Selector,
        #[serde(default)]
        kind: JoinKind,
    },
}

impl QueryOp {
    pub fn name(&self) -> &'static str {
        match self {
            QueryOp::Filter { .. } => "Where",
            QueryOp::Select { .. } => "Select",
            QueryOp::GroupBy { .. } => "GroupBy",
            QueryOp::Join { .. } => "Join",
        }
    }
}

/// Shape of a projection: a single value, or an anonymous record.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Value(Expr),
    Record(Vec<ProjectionItem>),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ProjectionItem {
    /// Explicit member name; `None` takes the expression's natural name
    #[serde(default)]
    pub name: Option<String>,
    pub expr: Expr,
}

impl ProjectionItem {
    pub fn named(name: &str, expr: Expr) -> Self {
        ProjectionItem {
            name: Some(name.to_string()),
            expr,
        }
    }

    pub fn implicit(expr: Expr) -> Self {
        ProjectionItem { name: None, expr }
    }

    /// Output member name, if one can be determined
    pub fn member_name(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| self.expr.natural_name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
}

impl QueryChain {
    pub fn from_entity(source: &str) -> Self {
        QueryChain {
            source: source.to_string(),
            ops: vec![],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LogicalPlanError> {
        let chain: QueryChain =
            serde_json::from_str(json).map_err(|e| LogicalPlanError::Parse(e.to_string()))?;
        chain.validate()?;
        Ok(chain)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, LogicalPlanError> {
        let chain: QueryChain =
            serde_yaml::from_str(yaml).map_err(|e| LogicalPlanError::Parse(e.to_string()))?;
        chain.validate()?;
        Ok(chain)
    }

    /// Structural checks that do not need the entity model.
    pub fn validate(&self) -> Result<(), LogicalPlanError> {
        for op in &self.ops {
            match op {
                QueryOp::Select { selector, .. } | QueryOp::GroupBy { key: selector, .. } => {
                    validate_selector(selector)?
                }
                QueryOp::Join {
                    inner,
                    outer_param,
                    inner_param,
                    result,
                    ..
                } => {
                    if outer_param == inner_param {
                        return Err(LogicalPlanError::DuplicateParameter(outer_param.clone()));
                    }
                    validate_selector(result)?;
                    inner.validate()?;
                }
                QueryOp::Filter { .. } => {}
            }
        }
        Ok(())
    }

    pub fn filter(mut self, param: &str, predicate: Expr) -> Self {
        self.ops.push(QueryOp::Filter {
            param: param.to_string(),
            predicate,
        });
        self
    }

    pub fn select_value(mut self, param: &str, expr: Expr) -> Self {
        self.ops.push(QueryOp::Select {
            param: param.to_string(),
            selector: Selector::Value(expr),
        });
        self
    }

    pub fn select_record(mut self, param: &str, items: Vec<ProjectionItem>) -> Self {
        self.ops.push(QueryOp::Select {
            param: param.to_string(),
            selector: Selector::Record(items),
        });
        self
    }

    pub fn group_by(mut self, param: &str, key: Selector) -> Self {
        self.ops.push(QueryOp::GroupBy {
            param: param.to_string(),
            key,
        });
        self
    }

    pub fn join(
        mut self,
        inner: QueryChain,
        params: (&str, &str),
        condition: Expr,
        result: Selector,
        kind: JoinKind,
    ) -> Self {
        self.ops.push(QueryOp::Join {
            inner: Box::new(inner),
            outer_param: params.0.to_string(),
            inner_param: params.1.to_string(),
            condition,
            result,
            kind,
        });
        self
    }
}

fn validate_selector(selector: &Selector) -> Result<(), LogicalPlanError> {
    match selector {
        Selector::Record(items) if items.is_empty() => Err(LogicalPlanError::EmptyRecord),
        _ => Ok(()),
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Value(expr) => write!(f, "{}", expr),
            Selector::Record(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match &item.name {
                        Some(name) => format!("{} = {}", name, item.expr),
                        None => item.expr.to_string(),
                    })
                    .collect();
                write!(f, "new {{ {} }}", parts.join(", "))
            }
        }
    }
}

impl fmt::Display for QueryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for op in &self.ops {
            match op {
                QueryOp::Filter { param, predicate } => {
                    write!(f, ".Where({} => {})", param, predicate)?
                }
                QueryOp::Select { param, selector } => {
                    write!(f, ".Select({} => {})", param, selector)?
                }
                QueryOp::GroupBy { param, key } => write!(f, ".GroupBy({} => {})", param, key)?,
                QueryOp::Join {
                    inner,
                    outer_param,
                    inner_param,
                    condition,
                    result,
                    kind,
                } => write!(
                    f,
                    ".Join({}, ({}, {}) => {}, ({}, {}) => {}, {:?})",
                    inner, outer_param, inner_param, condition, outer_param, inner_param, result, kind
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_yaml_chain() {
        let yaml = r#"
source: Post
ops:
  - op: filter
    param: p
    predicate:
      binary:
        op: not_equal
        left: { member: { target: { var: p }, name: Content } }
        right: { literal: "null" }
  - op: select
    param: p
    selector:
      record:
        - { expr: { member: { target: { var: p }, name: Blog } } }
        - name: Author
          expr: { member: { target: { member: { target: { var: p }, name: User } }, name: UserName } }
"#;
        let chain = QueryChain::from_yaml(yaml).unwrap();
        let expected = QueryChain::from_entity("Post")
            .filter("p", Expr::path("p.Content").not_equals(Expr::null()))
            .select_record(
                "p",
                vec![
                    ProjectionItem::implicit(Expr::path("p.Blog")),
                    ProjectionItem::named("Author", Expr::path("p.User.UserName")),
                ],
            );
        assert_eq!(chain, expected);
        assert_eq!(
            chain.to_string(),
            "Post.Where(p => (p.Content NotEqual null)).Select(p => new { p.Blog, Author = p.User.UserName })"
        );
    }

    #[test]
    fn test_join_kind_defaults_to_inner() {
        let json = r#"{
            "source": "Post",
            "ops": [{
                "op": "join",
                "inner": {"source": "Blog"},
                "outer_param": "p",
                "inner_param": "b",
                "condition": {"literal": {"boolean": true}},
                "result": {"value": {"var": "p"}}
            }]
        }"#;
        let chain = QueryChain::from_json(json).unwrap();
        match &chain.ops[0] {
            QueryOp::Join { kind, .. } => assert_eq!(*kind, JoinKind::Inner),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_empty_record_and_shadowed_params() {
        let chain = QueryChain::from_entity("Post").select_record("p", vec![]);
        assert_eq!(chain.validate(), Err(LogicalPlanError::EmptyRecord));

        let chain = QueryChain::from_entity("Post").join(
            QueryChain::from_entity("Blog"),
            ("x", "x"),
            Expr::boolean(true),
            Selector::Value(Expr::var("x")),
            JoinKind::Inner,
        );
        assert_eq!(
            chain.validate(),
            Err(LogicalPlanError::DuplicateParameter("x".to_string()))
        );
    }

    #[test]
    fn test_member_name() {
        assert_eq!(
            ProjectionItem::implicit(Expr::path("p.Blog.Url")).member_name(),
            Some("Url")
        );
        assert_eq!(
            ProjectionItem::named("PId", Expr::path("p.PostId")).member_name(),
            Some("PId")
        );
        assert_eq!(ProjectionItem::implicit(Expr::int(1)).member_name(), None);
    }
}
