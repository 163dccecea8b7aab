//! Quantifier and collection-aggregate decorrelation.
//!
//! `b.Posts.Any(p => P)` becomes a left outer join of
//!
//! ```sql
//! select p0.BlogId as BlogId_jk0 from Posts p0 where P group by p0.BlogId
//! ```
//!
//! on `b0.BlogId = sq0.BlogId_jk0`, tested with `sq0.BlogId_jk0 is not null`.
//! `All` negates the inner predicate and tests `is null`; a surrounding `not`
//! flips the outer test. Counting and value aggregates expose the aggregate
//! next to the join key and read it through the join.

use crate::entity_catalog::NavigationInfo;
use crate::query_planner::logical_expr::{AggregateFn, Expr, Lambda, Literal, QuantifierKind};
use crate::query_planner::typed_variable::{Bound, EntityRef, Env, ExprRole};

use super::errors::{Flow, FlowResult, TranslationError};
use super::expr_resolver::unsupported;
use super::plan_builder::{QueryState, QueryTranslator};
use super::render_expr::{AggregateFnCall, RenderExpr};
use super::{Join, JoinTarget, JoinType, Scope, SelectItem};

struct CorrelatedChild {
    scope: Scope,
    join_key: String,
    aggregate: Option<String>,
}

impl QueryTranslator<'_> {
    pub(super) fn collection_source(
        &self,
        state: &mut QueryState,
        env: &Env,
        collection: &Expr,
        role: ExprRole,
        path: &Expr,
    ) -> FlowResult<(EntityRef, String, NavigationInfo)> {
        match self.resolve_navigation(state, env, collection, role)? {
            Bound::Collection {
                source,
                nav_name,
                nav,
            } => {
                self.check_correlated_source(&source, path)?;
                Ok((source, nav_name, nav))
            }
            other => Err(unsupported(format!(
                "quantifier over a {} in `{}`",
                other.kind(),
                path
            ))),
        }
    }

    /// A collection navigated from a projected entity is read after the
    /// scope is wrapped, where the entity's key is a plain column.
    pub(super) fn check_correlated_source(&self, source: &EntityRef, path: &Expr) -> FlowResult<()> {
        if source.grouped {
            return Err(unsupported(format!(
                "collection of a grouped entity in `{}`",
                path
            )));
        }
        if source.projected && self.conservative() {
            return Err(Flow::Wrap);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn decorrelate_quantifier(
        &self,
        state: &mut QueryState,
        source: &EntityRef,
        nav_name: &str,
        nav: &NavigationInfo,
        kind: QuantifierKind,
        predicate: Option<&Lambda>,
        negated: bool,
        path: &Expr,
    ) -> FlowResult<RenderExpr> {
        if kind == QuantifierKind::All && predicate.is_none() {
            return Err(unsupported(format!("`All` needs a predicate in `{}`", path)));
        }
        let filter = predicate.map(|lambda| (lambda, kind == QuantifierKind::All));
        let child = self.build_child(nav, filter, None, path)?;
        let join_key = child.join_key.clone();
        let alias = self.join_child(state, source, nav_name, nav, child);
        let key = RenderExpr::column(&alias, &join_key);

        let holds_when_matched = (kind == QuantifierKind::Any) != negated;
        Ok(if holds_when_matched {
            RenderExpr::is_not_null(key)
        } else {
            RenderExpr::is_null(key)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn decorrelate_aggregate(
        &self,
        state: &mut QueryState,
        source: &EntityRef,
        nav_name: &str,
        nav: &NavigationInfo,
        func: AggregateFn,
        lambda: Option<&Lambda>,
        path: &Expr,
    ) -> FlowResult<RenderExpr> {
        let (filter, selector) = match (func, lambda) {
            (AggregateFn::Count, lambda) => (lambda.map(|l| (l, false)), None),
            (_, Some(lambda)) => (None, Some(lambda)),
            (_, None) => {
                return Err(unsupported(format!(
                    "{} over a collection needs a selector in `{}`",
                    func.sql_name(),
                    path
                )))
            }
        };
        let child = self.build_child(nav, filter, Some((func, selector)), path)?;
        let aggregate = child.aggregate.clone().ok_or_else(|| {
            TranslationError::UnsupportedOperator(format!("no aggregate exposed for `{}`", path))
        })?;
        let alias = self.join_child(state, source, nav_name, nav, child);
        let value = RenderExpr::column(&alias, &aggregate);

        Ok(match func {
            AggregateFn::Count | AggregateFn::Sum => {
                RenderExpr::coalesce(value, RenderExpr::Literal(Literal::Integer(0)))
            }
            _ => value,
        })
    }

    /// Grouped scope over the navigation target, exposing the column that
    /// links it back to the source as a join key.
    fn build_child(
        &self,
        nav: &NavigationInfo,
        filter: Option<(&Lambda, bool)>,
        aggregate: Option<(AggregateFn, Option<&Lambda>)>,
        path: &Expr,
    ) -> Result<CorrelatedChild, TranslationError> {
        let context = path.to_string();
        let mut child = QueryState::from_entity(self.metadata, &nav.target_entity)?;
        let root = EntityRef::table(&nav.target_entity, child.scope.root_alias());

        if let Some((lambda, negate)) = filter {
            let env = Env::new().bind(&lambda.param, child.row.clone());
            let mut predicate = self
                .translate_value(&mut child, &env, &lambda.body, ExprRole::Filter)
                .map_err(|flow| flow.into_error(&context))?;
            if negate {
                predicate = RenderExpr::negate(predicate);
            }
            child.scope.filters.push(predicate);
        }

        let key = root.column(&nav.target_column);
        child.scope.group_by.push(key.clone());
        let join_key = child.scope.aliases.next_join_key(&nav.target_column);
        child.scope.select.push(SelectItem::named(key, &join_key));

        let aggregate = match aggregate {
            None => None,
            Some((func, selector)) => {
                let args = match selector {
                    Some(lambda) => {
                        let env = Env::new().bind(&lambda.param, child.row.clone());
                        vec![self
                            .translate_value(&mut child, &env, &lambda.body, ExprRole::Projection)
                            .map_err(|flow| flow.into_error(&context))?]
                    }
                    None => vec![],
                };
                let name = child.scope.aliases.next_aggregate(func.column_base());
                child.scope.select.push(SelectItem::named(
                    RenderExpr::AggregateFnCall(AggregateFnCall {
                        name: func.sql_name().to_string(),
                        args,
                    }),
                    &name,
                ));
                Some(name)
            }
        };

        Ok(CorrelatedChild {
            scope: child.scope,
            join_key,
            aggregate,
        })
    }

    fn join_child(
        &self,
        state: &mut QueryState,
        source: &EntityRef,
        nav_name: &str,
        nav: &NavigationInfo,
        child: CorrelatedChild,
    ) -> String {
        let alias = state.scope.aliases.next_subquery_alias();
        log::debug!(
            "Decorrelating {}.{} into left outer join {}",
            source.alias,
            nav_name,
            alias
        );
        state.scope.joins.push(Join {
            join_type: JoinType::Left,
            joining_on: RenderExpr::equals(
                source.column(&nav.source_column),
                RenderExpr::column(&alias, &child.join_key),
            ),
            target: JoinTarget::Subquery(Box::new(child.scope)),
            alias: alias.clone(),
        });
        alias
    }
}
