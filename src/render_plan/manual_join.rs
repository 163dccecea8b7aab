//! Explicit `Join` operator.
//!
//! The inner chain is translated on its own and joined as a subquery. While
//! the result selector and the join condition are translated, values of the
//! inner row are bound lazily: each one is exposed from the inner scope only
//! when it is read, so the subquery selects exactly the columns the outer
//! query uses. Values read by the condition are exposed as join keys.

use crate::query_planner::logical_expr::Expr;
use crate::query_planner::logical_plan::{JoinKind, QueryChain, Selector};
use crate::query_planner::typed_variable::{Bound, DeferredNav, EntityRef, Env, ExprRole};

use super::errors::{Flow, FlowResult, TranslationError};
use super::expr_resolver::unsupported;
use super::plan_builder::{PendingJoin, QueryState, QueryTranslator};
use super::render_expr::RenderExpr;
use super::{Join, JoinTarget};

const DEFAULT_VALUE_NAME: &str = "Value";

fn pending_mut(state: &mut QueryState) -> Result<&mut PendingJoin, TranslationError> {
    state.pending.as_deref_mut().ok_or_else(|| {
        TranslationError::UnsupportedOperator(
            "join operand referenced outside of its Join".to_string(),
        )
    })
}

impl QueryTranslator<'_> {
    pub(super) fn manual_join(
        &self,
        mut state: QueryState,
        inner: &QueryChain,
        params: (&str, &str),
        condition: &Expr,
        result: &Selector,
        kind: JoinKind,
    ) -> FlowResult<QueryState> {
        let (outer_param, inner_param) = params;
        if state.row.is_group() {
            return Err(TranslationError::InvalidProjectionAfterGroupBy(
                "a group must be projected before Join".to_string(),
            )
            .into());
        }
        if state.scope.is_grouped() {
            return Err(Flow::Wrap);
        }

        let inner_state = self.run_chain(inner)?;
        let inner_state = if inner_state.projection_applied
            || inner_state.scope.is_grouped()
            || inner_state.row.is_group()
        {
            self.freeze(inner_state)?
        } else {
            inner_state
        };

        let alias = state.scope.aliases.next_subquery_alias();
        let inner_row = inner_state.row.clone();
        state.pending = Some(Box::new(PendingJoin {
            state: inner_state,
            alias: alias.clone(),
            optional: kind == JoinKind::LeftOuter,
        }));

        let env = Env::new()
            .bind(outer_param, state.row.clone())
            .bind(inner_param, Bound::Lazy(Box::new(inner_row)));
        let row = self.resolve_selector(&mut state, &env, result, ExprRole::Projection)?;
        let mut row = self.export_lazy(&mut state, row)?;
        let joining_on =
            self.translate_value(&mut state, &env, condition, ExprRole::JoinCondition)?;

        let pending = state.pending.take().ok_or_else(|| {
            TranslationError::UnsupportedOperator("join operand lost during translation".to_string())
        })?;
        if pending.state.scope.select.is_empty() {
            return Err(unsupported(format!(
                "Join must read at least one value of `{}`",
                inner
            )));
        }

        log::debug!("{:?} join of {} as {}", kind, inner.source, alias);
        state.scope.joins.push(Join {
            join_type: kind.into(),
            target: JoinTarget::Subquery(Box::new(pending.state.scope)),
            alias,
            joining_on,
        });
        row.mark_projected();
        state.row = row;
        state.projection_applied = true;
        Ok(state)
    }

    /// Member access on a lazily bound inner value, resolved inside the
    /// inner scope.
    pub(super) fn lazy_member(
        &self,
        state: &mut QueryState,
        inner: Bound,
        name: &str,
        path: &Expr,
        navigates: bool,
    ) -> FlowResult<Bound> {
        let pending = pending_mut(state)?;
        let resolved = self
            .member(&mut pending.state, inner, name, path, ExprRole::Projection, navigates)
            .map_err(|flow| Flow::Failed(flow.into_error(&path.to_string())))?;
        Ok(Bound::Lazy(Box::new(resolved)))
    }

    /// Read an inner value from the outer scope through the join alias.
    pub(super) fn lazy_value(
        &self,
        state: &mut QueryState,
        inner: Bound,
        role: ExprRole,
        path: &Expr,
    ) -> FlowResult<RenderExpr> {
        let base = match &inner {
            Bound::Scalar {
                natural: Some(name),
                ..
            } => name.clone(),
            _ => String::new(),
        };
        let pending = pending_mut(state)?;
        let value = self
            .value_of(&mut pending.state, inner, ExprRole::Projection, path)
            .map_err(|flow| Flow::Failed(flow.into_error(&path.to_string())))?;
        let base = if base.is_empty() {
            value
                .column_name()
                .unwrap_or(DEFAULT_VALUE_NAME)
                .to_string()
        } else {
            base
        };
        let name = pending
            .state
            .scope
            .expose(value, &base, role == ExprRole::JoinCondition);
        Ok(RenderExpr::column(&pending.alias, &name))
    }

    /// Replace lazy inner values in a join result with columns of the join
    /// alias.
    fn export_lazy(&self, state: &mut QueryState, bound: Bound) -> FlowResult<Bound> {
        match bound {
            Bound::Lazy(inner) => self.export_inner(state, *inner),
            Bound::Record(fields) => {
                let mut exported = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    exported.push((name, self.export_lazy(state, value)?));
                }
                Ok(Bound::Record(exported))
            }
            other => Ok(other),
        }
    }

    fn export_inner(&self, state: &mut QueryState, inner: Bound) -> FlowResult<Bound> {
        if let Bound::Record(fields) = inner {
            let mut exported = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                exported.push((name, self.export_inner(state, value)?));
            }
            return Ok(Bound::Record(exported));
        }

        let pending = pending_mut(state)?;
        match inner {
            Bound::Scalar { expr, natural } => {
                let base = natural
                    .clone()
                    .or_else(|| expr.column_name().map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_VALUE_NAME.to_string());
                let name = pending.state.scope.expose(expr, &base, false);
                Ok(Bound::Scalar {
                    expr: RenderExpr::column(&pending.alias, &name),
                    natural,
                })
            }
            Bound::Entity(e) => {
                let mut renamed = vec![];
                for column in self.metadata.columns_of(&e.entity)? {
                    let expr = e.column(&column);
                    if e.grouped {
                        pending.state.scope.ensure_grouped(expr.clone());
                    }
                    let name = pending.state.scope.expose(expr, &column, false);
                    if name != column {
                        renamed.push((column, name));
                    }
                }
                Ok(Bound::Entity(EntityRef {
                    optional: e.optional || pending.optional,
                    ..EntityRef::subquery(&e.entity, &pending.alias, renamed)
                }))
            }
            Bound::Deferred(d) => {
                let name = pending
                    .state
                    .scope
                    .expose(d.source_key(), &d.nav.source_column, true);
                Ok(Bound::Deferred(DeferredNav {
                    source_alias: pending.alias.clone(),
                    source_column: name,
                    source_optional: d.source_optional || pending.optional,
                    exposed: true,
                    ..d
                }))
            }
            other => Err(unsupported(format!(
                "a {} of a join operand cannot be returned",
                other.kind()
            ))),
        }
    }
}
