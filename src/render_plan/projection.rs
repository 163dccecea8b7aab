//! Projection output and subquery wrapping.
//!
//! `freeze` turns the current scope into a subquery: every value the row
//! still refers to is exposed under a unique name, and the row is rebased
//! onto the wrapper's alias. A column whose name is already taken is exposed
//! as `<Column>_jk<n>` and the rebased entity remembers the rename.
//! `finish` writes the final row into the outermost select list.

use crate::query_planner::typed_variable::{Backing, Bound, DeferredNav, EntityRef, ExprRole};

use super::alias_manager::AliasManager;
use super::errors::TranslationError;
use super::plan_builder::{QueryState, QueryTranslator};
use super::render_expr::{ColumnAlias, RenderExpr, TableAlias};
use super::{Scope, SelectItem};

const DEFAULT_VALUE_NAME: &str = "Value";

/// Names claimed in a select list together with the value behind each.
#[derive(Default)]
struct OutputNames(Vec<(String, RenderExpr)>);

impl OutputNames {
    fn get(&self, name: &str) -> Option<&RenderExpr> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Returns false when `name` already holds `expr`.
    fn claim(&mut self, name: &str, expr: &RenderExpr) -> Result<bool, TranslationError> {
        match self.get(name) {
            Some(existing) if existing == expr => Ok(false),
            Some(_) => Err(TranslationError::AmbiguousOutputName(name.to_string())),
            None => {
                self.0.push((name.to_string(), expr.clone()));
                Ok(true)
            }
        }
    }
}

/// Expose `expr` under `base`, or under a fresh join-key name when `base`
/// already holds another value. Returns the name used.
fn expose_column(
    scope: &mut Scope,
    names: &mut OutputNames,
    expr: RenderExpr,
    base: &str,
) -> Result<String, TranslationError> {
    let mut name = base.to_string();
    while let Some(existing) = names.get(&name) {
        if *existing == expr {
            return Ok(name);
        }
        name = scope.aliases.next_join_key(base);
    }
    names.claim(&name, &expr)?;
    scope.select.push(SelectItem::named(expr, &name));
    Ok(name)
}

impl QueryTranslator<'_> {
    /// Wrap the current scope in a subquery and continue from the wrapper.
    pub(super) fn freeze(&self, state: QueryState) -> Result<QueryState, TranslationError> {
        let QueryState { mut scope, row, .. } = state;
        if row.is_group() {
            return Err(TranslationError::InvalidProjectionAfterGroupBy(
                "a group must be projected before the query continues".to_string(),
            ));
        }

        let mut aliases = AliasManager::new();
        let alias = aliases.next_subquery_alias();
        scope.reset_projection();
        let mut names = OutputNames::default();
        let row = self.expose_row(&mut scope, row, None, &alias, &mut names)?;
        log::debug!(
            "Froze scope into {} exposing {} column(s)",
            alias,
            scope.select.len()
        );

        Ok(QueryState {
            scope: Scope::wrapping(scope, aliases, alias),
            row,
            projection_applied: false,
            pending: None,
        })
    }

    fn expose_row(
        &self,
        scope: &mut Scope,
        bound: Bound,
        name: Option<&str>,
        alias: &str,
        names: &mut OutputNames,
    ) -> Result<Bound, TranslationError> {
        match bound {
            Bound::Scalar { expr, natural } => {
                let out = name
                    .map(str::to_string)
                    .or_else(|| natural.clone())
                    .unwrap_or_else(|| DEFAULT_VALUE_NAME.to_string());
                let exposed = expose_column(scope, names, expr, &out)?;
                let natural = if exposed == out { natural } else { natural.or(Some(out)) };
                Ok(Bound::Scalar {
                    expr: RenderExpr::column(alias, &exposed),
                    natural,
                })
            }
            Bound::Entity(e) => {
                let columns = self.metadata.columns_of(&e.entity)?;
                let star = e.backing == Backing::Table
                    && !e.grouped
                    && columns.iter().all(|c| names.get(c).is_none());
                let mut renamed = vec![];
                if star {
                    for c in &columns {
                        names.claim(c, &e.column(c))?;
                    }
                    scope
                        .select
                        .push(SelectItem::new(RenderExpr::TableStar(TableAlias(e.alias.clone()))));
                } else {
                    for c in &columns {
                        let expr = e.column(c);
                        if e.grouped {
                            scope.ensure_grouped(expr.clone());
                        }
                        let exposed = expose_column(scope, names, expr, c)?;
                        if exposed != *c {
                            renamed.push((c.clone(), exposed));
                        }
                    }
                }
                Ok(Bound::Entity(EntityRef {
                    optional: e.optional,
                    ..EntityRef::subquery(&e.entity, alias, renamed)
                }))
            }
            Bound::Deferred(d) => {
                let join_key = scope.aliases.next_join_key(&d.nav.source_column);
                let join_key = expose_column(scope, names, d.source_key(), &join_key)?;
                Ok(Bound::Deferred(DeferredNav {
                    source_alias: alias.to_string(),
                    source_column: join_key,
                    exposed: true,
                    ..d
                }))
            }
            Bound::Record(fields) => {
                let mut rebased = Vec::with_capacity(fields.len());
                for (field, value) in fields {
                    let value = self.expose_row(scope, value, Some(&field), alias, names)?;
                    rebased.push((field, value));
                }
                Ok(Bound::Record(rebased))
            }
            Bound::Group { .. } => Err(TranslationError::InvalidProjectionAfterGroupBy(
                "a group cannot be wrapped in a subquery".to_string(),
            )),
            other => Err(TranslationError::UnsupportedOperator(format!(
                "a {} cannot be exposed from a subquery",
                other.kind()
            ))),
        }
    }

    /// Write the final row into the select list of the outermost scope.
    pub(super) fn finish(&self, state: QueryState) -> Result<Scope, TranslationError> {
        let state = if state.row.has_unexposed_deferred() {
            log::debug!("Final row navigates from projected entities, wrapping");
            self.freeze(state)?
        } else {
            state
        };
        let QueryState { mut scope, row, .. } = state;
        scope.reset_projection();
        let mut names = OutputNames::default();
        self.output(&mut scope, row, None, &mut names)?;
        Ok(scope)
    }

    fn output(
        &self,
        scope: &mut Scope,
        bound: Bound,
        name: Option<&str>,
        names: &mut OutputNames,
    ) -> Result<(), TranslationError> {
        match bound {
            Bound::Scalar { expr, natural } => {
                let out = name.map(str::to_string).or(natural);
                if let Some(out) = &out {
                    names.claim(out, &expr)?;
                }
                scope.select.push(SelectItem {
                    expression: expr,
                    col_alias: out.map(ColumnAlias),
                });
                Ok(())
            }
            Bound::Entity(e) => self.output_entity(scope, &e, names),
            Bound::Deferred(d) => {
                let e = self.materialise(scope, &d, ExprRole::Projection)?;
                self.output_entity(scope, &e, names)
            }
            Bound::Record(fields) => {
                for (field, value) in fields {
                    self.output(scope, value, Some(&field), names)?;
                }
                Ok(())
            }
            Bound::Group { .. } => Err(TranslationError::InvalidProjectionAfterGroupBy(
                "select the group key or aggregates of the group".to_string(),
            )),
            other => Err(TranslationError::UnsupportedOperator(format!(
                "a {} cannot be returned",
                other.kind()
            ))),
        }
    }

    /// Every column of a returned entity is an output name, whether it is
    /// listed or covered by `alias.*`.
    fn output_entity(
        &self,
        scope: &mut Scope,
        e: &EntityRef,
        names: &mut OutputNames,
    ) -> Result<(), TranslationError> {
        let columns = self.metadata.columns_of(&e.entity)?;
        for c in &columns {
            names.claim(c, &e.column(c))?;
        }
        if e.backing == Backing::Table && !e.grouped {
            scope
                .select
                .push(SelectItem::new(RenderExpr::TableStar(TableAlias(e.alias.clone()))));
            return Ok(());
        }
        for c in &columns {
            let expr = e.column(c);
            if e.grouped {
                scope.ensure_grouped(expr.clone());
            }
            scope.select.push(SelectItem::named(expr, c));
        }
        Ok(())
    }
}
