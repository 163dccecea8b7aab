//! GroupBy translation.
//!
//! Key items become the scope's group-by list; entity keys group by their
//! key column and mark the entity so that later column references are
//! appended to the list. After grouping the row is a [`Bound::Group`] whose
//! `Key` is addressable and whose element row feeds aggregates.

use crate::query_planner::logical_expr::{AggregateFn, Expr, Lambda, Literal};
use crate::query_planner::logical_plan::Selector;
use crate::query_planner::typed_variable::{Bound, Env, ExprRole};

use super::errors::{Flow, FlowResult};
use super::expr_resolver::unsupported;
use super::plan_builder::{QueryState, QueryTranslator};
use super::render_expr::{AggregateFnCall, RenderCase, RenderExpr};
use super::Scope;

impl QueryTranslator<'_> {
    pub(super) fn group_by(
        &self,
        mut state: QueryState,
        param: &str,
        key: &Selector,
    ) -> FlowResult<QueryState> {
        if state.row.is_group() {
            return Err(unsupported(
                "GroupBy directly after GroupBy; project the group first".to_string(),
            ));
        }
        if state.scope.is_grouped() {
            return Err(Flow::Wrap);
        }

        let env = Env::new().bind(param, state.row.clone());
        let key = self.resolve_selector(&mut state, &env, key, ExprRole::Projection)?;
        let key = self.group_key(&mut state.scope, key)?;
        log::debug!("Grouping by {} column(s)", state.scope.group_by.len());

        let element = std::mem::replace(&mut state.row, Bound::Record(vec![]));
        state.row = Bound::Group {
            key: Box::new(key),
            element: Box::new(element),
        };
        Ok(state)
    }

    fn group_key(&self, scope: &mut Scope, key: Bound) -> FlowResult<Bound> {
        match key {
            Bound::Scalar { expr, natural } => {
                scope.ensure_grouped(expr.clone());
                Ok(Bound::Scalar { expr, natural })
            }
            Bound::Entity(mut e) => {
                let key_column = self.metadata.key_column_of(&e.entity)?;
                scope.ensure_grouped(e.column(&key_column));
                e.grouped = true;
                Ok(Bound::Entity(e))
            }
            Bound::Deferred(d) => {
                if !d.exposed {
                    return Err(Flow::Wrap);
                }
                let e = self.materialise(scope, &d, ExprRole::Projection)?;
                self.group_key(scope, Bound::Entity(e))
            }
            Bound::Record(fields) => {
                let mut grouped = Vec::with_capacity(fields.len());
                for (name, bound) in fields {
                    grouped.push((name, self.group_key(scope, bound)?));
                }
                Ok(Bound::Record(grouped))
            }
            other => Err(unsupported(format!(
                "a {} cannot be a group key",
                other.kind()
            ))),
        }
    }

    /// Aggregate over the rows of a group. `count` takes a predicate and
    /// counts matching rows; other functions take a value selector.
    pub(super) fn group_aggregate(
        &self,
        state: &mut QueryState,
        env: &Env,
        element: Bound,
        func: AggregateFn,
        lambda: Option<&Lambda>,
        path: &Expr,
    ) -> FlowResult<RenderExpr> {
        let args = match (func, lambda) {
            (AggregateFn::Count, None) => vec![],
            (AggregateFn::Count, Some(lambda)) => {
                let env = env.clone().bind(&lambda.param, element);
                let predicate =
                    self.translate_value(state, &env, &lambda.body, ExprRole::Projection)?;
                vec![RenderExpr::Case(RenderCase {
                    when_then: vec![(predicate, RenderExpr::Literal(Literal::Integer(1)))],
                })]
            }
            (_, Some(lambda)) => {
                let env = env.clone().bind(&lambda.param, element);
                vec![self.translate_value(state, &env, &lambda.body, ExprRole::Projection)?]
            }
            (_, None) => vec![self.value_of(state, element, ExprRole::Projection, path)?],
        };
        Ok(RenderExpr::AggregateFnCall(AggregateFnCall {
            name: func.sql_name().to_string(),
            args,
        }))
    }
}
