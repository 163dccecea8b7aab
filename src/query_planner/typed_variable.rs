//! Row bindings.
//!
//! While an operator chain is translated, the current row and every lambda
//! parameter are described by a [`Bound`] value: what the host-language value
//! is (scalar, entity, record, group) and how it is reached in the current
//! [`Scope`](crate::render_plan::Scope).
//!
//! Bindings are plain values. Re-binding after a scope is wrapped produces a
//! new tree pointing at the subquery's exposed columns.

use serde::Serialize;

use crate::entity_catalog::NavigationInfo;
use crate::render_plan::render_expr::RenderExpr;

// ============================================================================
// Entity references
// ============================================================================

/// How an entity's columns are reached in the scope that binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backing {
    /// A table joined (or selected from) directly; renders `alias.*`
    Table,
    /// Columns exposed by a subquery under their own names
    Subquery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRef {
    pub entity: String,
    pub alias: String,
    pub backing: Backing,
    /// Reached through a left outer join somewhere along its path
    pub optional: bool,
    /// Carried through a prior `Select`
    pub projected: bool,
    /// Part of a group key; referenced columns must be grouped
    pub grouped: bool,
    /// Subquery columns exposed under another name, as (column, exposed)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renamed: Vec<(String, String)>,
}

impl EntityRef {
    pub fn table(entity: &str, alias: &str) -> Self {
        EntityRef {
            entity: entity.to_string(),
            alias: alias.to_string(),
            backing: Backing::Table,
            optional: false,
            projected: false,
            grouped: false,
            renamed: vec![],
        }
    }

    /// A subquery-backed entity under `alias`.
    pub fn subquery(entity: &str, alias: &str, renamed: Vec<(String, String)>) -> Self {
        EntityRef {
            backing: Backing::Subquery,
            renamed,
            ..Self::table(entity, alias)
        }
    }

    /// Name under which `column` is visible through `alias`
    pub fn column_name(&self, column: &str) -> String {
        self.renamed
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, exposed)| exposed.clone())
            .unwrap_or_else(|| column.to_string())
    }

    pub fn column(&self, column: &str) -> RenderExpr {
        RenderExpr::column(&self.alias, &self.column_name(column))
    }
}

/// A single-valued navigation that has not been joined yet.
///
/// `source_alias.source_column` holds the foreign key. Until `exposed` is
/// set the key lives only in the scope that created the reference; once a
/// scope is wrapped the key is exposed as a join-key column of the subquery
/// and the navigation can be joined in the outer scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeferredNav {
    pub nav_name: String,
    pub source_alias: String,
    pub source_column: String,
    /// The entity the navigation starts from may be absent
    pub source_optional: bool,
    #[serde(skip)]
    pub nav: NavigationInfo,
    pub exposed: bool,
}

impl DeferredNav {
    pub fn source_key(&self) -> RenderExpr {
        RenderExpr::column(&self.source_alias, &self.source_column)
    }
}

// ============================================================================
// Bindings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Bound {
    Scalar {
        expr: RenderExpr,
        /// Name used when the value is projected without an explicit one
        natural: Option<String>,
    },
    Entity(EntityRef),
    Deferred(DeferredNav),
    Record(Vec<(String, Bound)>),
    /// Result of `GroupBy`: the key, plus the pre-grouping row for aggregates
    Group { key: Box<Bound>, element: Box<Bound> },
    /// Collection navigation; only valid as a quantifier or aggregate source
    Collection {
        source: EntityRef,
        nav_name: String,
        #[serde(skip)]
        nav: NavigationInfo,
    },
    /// Value of the inner side of a manual join, expressed in the inner
    /// query's scope; resolved members are exported through the join alias
    Lazy(Box<Bound>),
}

impl Bound {
    pub fn scalar(expr: RenderExpr, natural: Option<&str>) -> Self {
        Bound::Scalar {
            expr,
            natural: natural.map(str::to_string),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Bound::Scalar { .. } => "scalar",
            Bound::Entity(_) => "entity",
            Bound::Deferred(_) => "entity reference",
            Bound::Record(_) => "record",
            Bound::Group { .. } => "group",
            Bound::Collection { .. } => "collection",
            Bound::Lazy(_) => "join operand",
        }
    }

    /// Mark every entity in the row as the output of a projection.
    pub fn mark_projected(&mut self) {
        match self {
            Bound::Entity(e) => e.projected = true,
            Bound::Record(fields) => fields.iter_mut().for_each(|(_, b)| b.mark_projected()),
            _ => {}
        }
    }

    pub fn mark_optional(&mut self) {
        match self {
            Bound::Entity(e) => e.optional = true,
            Bound::Record(fields) => fields.iter_mut().for_each(|(_, b)| b.mark_optional()),
            _ => {}
        }
    }

    pub fn has_unexposed_deferred(&self) -> bool {
        match self {
            Bound::Deferred(d) => !d.exposed,
            Bound::Record(fields) => fields.iter().any(|(_, b)| b.has_unexposed_deferred()),
            Bound::Group { key, element } => {
                key.has_unexposed_deferred() || element.has_unexposed_deferred()
            }
            _ => false,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Bound::Group { .. })
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Lambda parameters in scope, innermost last.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: Vec<(String, Bound)>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: &str, bound: Bound) -> Self {
        self.vars.push((name.to_string(), bound));
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Bound> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
    }
}

/// Clause an expression is translated for. Decides join kinds and how
/// values of the inner side of a manual join are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprRole {
    Filter,
    Projection,
    JoinCondition,
}
