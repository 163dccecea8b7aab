//! Relational plan and the translator that builds it.
//!
//! A [`Scope`] is one SQL `SELECT`: a root source, joins in creation order,
//! a projection list, predicates, and group keys. Scopes nest through
//! [`FromSource::Subquery`] and [`JoinTarget::Subquery`]; a child scope is
//! owned by the clause that references it and never points back.

use serde::Serialize;
use std::collections::HashMap;

use crate::query_planner::typed_variable::EntityRef;

pub mod alias_manager;
mod decorrelator;
pub mod errors;
mod expr_resolver;
mod group_by_builder;
mod join_builder;
mod manual_join;
pub mod plan_builder;
mod projection;
pub mod render_expr;

#[cfg(test)]
mod tests;

use alias_manager::AliasManager;
use render_expr::{ColumnAlias, RenderExpr};

pub use plan_builder::{translate, QueryTranslator};

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub from: FromSource,
    pub joins: Vec<Join>,
    pub select: Vec<SelectItem>,
    pub filters: Vec<RenderExpr>,
    pub group_by: Vec<RenderExpr>,
    pub having: Vec<RenderExpr>,
    #[serde(skip)]
    pub(crate) aliases: AliasManager,
    /// Navigation joins keyed by (source alias, navigation name)
    #[serde(skip)]
    pub(crate) join_cache: HashMap<(String, String), EntityRef>,
    #[serde(skip)]
    exposures: Vec<Exposure>,
}

#[derive(Debug, Clone)]
struct Exposure {
    expr: RenderExpr,
    join_key: bool,
    name: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum FromSource {
    Table { name: String, alias: String },
    Subquery { scope: Box<Scope>, alias: String },
}

impl FromSource {
    pub fn alias(&self) -> &str {
        match self {
            FromSource::Table { alias, .. } | FromSource::Subquery { alias, .. } => alias,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize)]
pub enum JoinTarget {
    Table(String),
    Subquery(Box<Scope>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Join {
    pub join_type: JoinType,
    pub target: JoinTarget,
    pub alias: String,
    pub joining_on: RenderExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SelectItem {
    pub expression: RenderExpr,
    pub col_alias: Option<ColumnAlias>,
}

impl SelectItem {
    pub fn new(expression: RenderExpr) -> Self {
        SelectItem {
            expression,
            col_alias: None,
        }
    }

    pub fn named(expression: RenderExpr, name: &str) -> Self {
        SelectItem {
            expression,
            col_alias: Some(ColumnAlias(name.to_string())),
        }
    }

    /// Name the item is visible under from an enclosing scope
    pub fn output_name(&self) -> Option<&str> {
        match &self.col_alias {
            Some(ColumnAlias(name)) => Some(name.as_str()),
            None => self.expression.column_name(),
        }
    }
}

impl Scope {
    pub(crate) fn from_table(table: &str) -> Self {
        let mut aliases = AliasManager::new();
        let alias = aliases.next_table_alias(table);
        Self::with_source(
            FromSource::Table {
                name: table.to_string(),
                alias,
            },
            aliases,
        )
    }

    /// A fresh scope selecting from `inner` under `alias`, which must be the
    /// first subquery alias handed out by `aliases`.
    pub(crate) fn wrapping(inner: Scope, aliases: AliasManager, alias: String) -> Self {
        Self::with_source(
            FromSource::Subquery {
                scope: Box::new(inner),
                alias,
            },
            aliases,
        )
    }

    fn with_source(from: FromSource, aliases: AliasManager) -> Self {
        Scope {
            from,
            joins: vec![],
            select: vec![],
            filters: vec![],
            group_by: vec![],
            having: vec![],
            aliases,
            join_cache: HashMap::new(),
            exposures: vec![],
        }
    }

    pub fn root_alias(&self) -> &str {
        self.from.alias()
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Add `expr` to the group-by list unless it is already there.
    pub(crate) fn ensure_grouped(&mut self, expr: RenderExpr) {
        if !self.group_by.contains(&expr) {
            log::debug!("Appending {:?} to group by", expr);
            self.group_by.push(expr);
        }
    }

    pub(crate) fn reset_projection(&mut self) {
        self.select.clear();
        self.exposures.clear();
    }

    /// Expose `expr` in this scope's select list and return the column name
    /// an enclosing scope reads it under. Join keys get `<base>_jk<n>`; other
    /// values keep `base` unless that name is taken. Repeated requests for the
    /// same expression and kind return the first name.
    pub(crate) fn expose(&mut self, expr: RenderExpr, base: &str, join_key: bool) -> String {
        if let Some(existing) = self
            .exposures
            .iter()
            .find(|e| e.expr == expr && e.join_key == join_key)
        {
            return existing.name.clone();
        }
        let taken = |name: &str, scope: &Scope| {
            scope
                .select
                .iter()
                .any(|item| item.output_name() == Some(name))
        };
        let name = if !join_key && !taken(base, self) {
            base.to_string()
        } else {
            let mut candidate = self.aliases.next_join_key(base);
            while taken(&candidate, self) {
                candidate = self.aliases.next_join_key(base);
            }
            candidate
        };
        self.select.push(SelectItem::named(expr.clone(), &name));
        self.exposures.push(Exposure {
            expr,
            join_key,
            name: name.clone(),
        });
        name
    }

    /// Names visible from an enclosing scope, in select order. Whole-table
    /// items contribute nothing here.
    pub fn output_names(&self) -> Vec<&str> {
        self.select.iter().filter_map(|i| i.output_name()).collect()
    }

    pub fn predicate(&self) -> Option<RenderExpr> {
        RenderExpr::conjunction(self.filters.clone())
    }

    pub fn having_predicate(&self) -> Option<RenderExpr> {
        RenderExpr::conjunction(self.having.clone())
    }
}

impl From<crate::query_planner::logical_plan::JoinKind> for JoinType {
    fn from(kind: crate::query_planner::logical_plan::JoinKind) -> Self {
        use crate::query_planner::logical_plan::JoinKind;
        match kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::LeftOuter => JoinType::Left,
            JoinKind::RightOuter => JoinType::Right,
        }
    }
}
