//! Expression resolution against the current scope.
//!
//! Lambda bodies are walked bottom-up. Each sub-expression resolves to a
//! [`Bound`]: member chains extend the join graph, quantifiers and
//! collection aggregates are decorrelated, and anything used as a value is
//! lowered to a [`RenderExpr`].

use crate::entity_catalog::NavigationInfo;
use crate::query_planner::logical_expr::{Expr, Literal, Operator, GROUP_KEY_MEMBER};
use crate::query_planner::logical_plan::Selector;
use crate::query_planner::typed_variable::{Bound, DeferredNav, EntityRef, Env, ExprRole};

use super::errors::{Flow, FlowResult, TranslationError};
use super::plan_builder::{QueryState, QueryTranslator};
use super::render_expr::RenderExpr;

pub(super) fn unsupported(message: String) -> Flow {
    Flow::Failed(TranslationError::UnsupportedOperator(message))
}

fn is_null_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Literal::Null))
}

impl QueryTranslator<'_> {
    pub(super) fn translate_value(
        &self,
        state: &mut QueryState,
        env: &Env,
        expr: &Expr,
        role: ExprRole,
    ) -> FlowResult<RenderExpr> {
        let bound = self.resolve(state, env, expr, role)?;
        self.value_of(state, bound, role, expr)
    }

    pub(super) fn resolve_selector(
        &self,
        state: &mut QueryState,
        env: &Env,
        selector: &Selector,
        role: ExprRole,
    ) -> FlowResult<Bound> {
        match selector {
            Selector::Value(expr) => self.resolve(state, env, expr, role),
            Selector::Record(items) => {
                let mut fields: Vec<(String, Bound)> = Vec::with_capacity(items.len());
                for item in items {
                    let name = item
                        .member_name()
                        .ok_or_else(|| {
                            unsupported(format!("record member `{}` needs a name", item.expr))
                        })?
                        .to_string();
                    if fields.iter().any(|(n, _)| *n == name) {
                        return Err(TranslationError::AmbiguousOutputName(name).into());
                    }
                    let bound = self.resolve(state, env, &item.expr, role)?;
                    fields.push((name, bound));
                }
                Ok(Bound::Record(fields))
            }
        }
    }

    pub(super) fn resolve(
        &self,
        state: &mut QueryState,
        env: &Env,
        expr: &Expr,
        role: ExprRole,
    ) -> FlowResult<Bound> {
        match expr {
            Expr::Literal(lit) => Ok(Bound::scalar(RenderExpr::Literal(lit.clone()), None)),
            Expr::Var(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| TranslationError::UnboundVariable(name.clone()).into()),
            Expr::Member { target, name } => {
                let target = self.resolve_navigation(state, env, target, role)?;
                self.member(state, target, name, expr, role, false)
            }
            Expr::Binary { op, left, right } => {
                let value = self.binary(state, env, *op, left, right, role)?;
                Ok(Bound::scalar(value, None))
            }
            Expr::Not(inner) => {
                let value = match inner.as_ref() {
                    Expr::Quantifier {
                        kind,
                        collection,
                        predicate,
                    } => {
                        let (source, nav_name, nav) =
                            self.collection_source(state, env, collection, role, expr)?;
                        self.decorrelate_quantifier(
                            state,
                            &source,
                            &nav_name,
                            &nav,
                            *kind,
                            predicate.as_ref(),
                            true,
                            expr,
                        )?
                    }
                    other => RenderExpr::negate(self.translate_value(state, env, other, role)?),
                };
                Ok(Bound::scalar(value, None))
            }
            Expr::Quantifier {
                kind,
                collection,
                predicate,
            } => {
                let (source, nav_name, nav) =
                    self.collection_source(state, env, collection, role, expr)?;
                let value = self.decorrelate_quantifier(
                    state,
                    &source,
                    &nav_name,
                    &nav,
                    *kind,
                    predicate.as_ref(),
                    false,
                    expr,
                )?;
                Ok(Bound::scalar(value, None))
            }
            Expr::Aggregate {
                func,
                source,
                lambda,
            } => {
                let value = match self.resolve_navigation(state, env, source, role)? {
                    Bound::Group { element, .. } => {
                        self.group_aggregate(state, env, *element, *func, lambda.as_ref(), expr)?
                    }
                    Bound::Collection {
                        source,
                        nav_name,
                        nav,
                    } => {
                        self.check_correlated_source(&source, expr)?;
                        self.decorrelate_aggregate(
                            state,
                            &source,
                            &nav_name,
                            &nav,
                            *func,
                            lambda.as_ref(),
                            expr,
                        )?
                    }
                    other => {
                        return Err(unsupported(format!(
                            "{} over a {} in `{}`",
                            func.sql_name(),
                            other.kind(),
                            expr
                        )))
                    }
                };
                Ok(Bound::scalar(value, None))
            }
        }
    }

    /// Resolve an expression that is navigated further: the target of a
    /// member access, or the source of a quantifier or aggregate. An unknown
    /// entity member here is reported as a navigation.
    pub(super) fn resolve_navigation(
        &self,
        state: &mut QueryState,
        env: &Env,
        expr: &Expr,
        role: ExprRole,
    ) -> FlowResult<Bound> {
        match expr {
            Expr::Member { target, name } => {
                let target = self.resolve_navigation(state, env, target, role)?;
                self.member(state, target, name, expr, role, true)
            }
            other => self.resolve(state, env, other, role),
        }
    }

    fn binary(
        &self,
        state: &mut QueryState,
        env: &Env,
        op: Operator,
        left: &Expr,
        right: &Expr,
        role: ExprRole,
    ) -> FlowResult<RenderExpr> {
        if matches!(op, Operator::Equal | Operator::NotEqual) {
            let tested = match (is_null_literal(left), is_null_literal(right)) {
                (false, true) => Some(left),
                (true, false) => Some(right),
                _ => None,
            };
            if let Some(operand) = tested {
                let value = self.null_test_operand(state, env, operand, role)?;
                return Ok(if op == Operator::Equal {
                    RenderExpr::is_null(value)
                } else {
                    RenderExpr::is_not_null(value)
                });
            }
        }
        let lhs = self.translate_value(state, env, left, role)?;
        let rhs = self.translate_value(state, env, right, role)?;
        Ok(RenderExpr::apply(op.into(), vec![lhs, rhs]))
    }

    /// Operand of a null test. A single-valued navigation is tested through
    /// its foreign key, so no join is needed.
    fn null_test_operand(
        &self,
        state: &mut QueryState,
        env: &Env,
        operand: &Expr,
        role: ExprRole,
    ) -> FlowResult<RenderExpr> {
        let Expr::Member { target, name } = operand else {
            return self.translate_value(state, env, operand, role);
        };
        let target_bound = self.resolve_navigation(state, env, target, role)?;
        if let Bound::Entity(e) = &target_bound {
            if let Ok(nav) = self.metadata.navigation_of(&e.entity, name) {
                if !nav.collection {
                    let fk = e.column(&nav.source_column);
                    if e.grouped {
                        state.scope.ensure_grouped(fk.clone());
                    }
                    return Ok(fk);
                }
            }
        }
        let bound = self.member(state, target_bound, name, operand, role, false)?;
        self.value_of(state, bound, role, operand)
    }

    pub(super) fn member(
        &self,
        state: &mut QueryState,
        target: Bound,
        name: &str,
        path: &Expr,
        role: ExprRole,
        navigates: bool,
    ) -> FlowResult<Bound> {
        match target {
            Bound::Entity(e) => self.entity_member(state, &e, name, path, role, navigates),
            Bound::Deferred(d) => {
                if !d.exposed {
                    return Err(Flow::Wrap);
                }
                let e = self.materialise(&mut state.scope, &d, role)?;
                self.entity_member(state, &e, name, path, role, navigates)
            }
            Bound::Record(fields) => fields
                .into_iter()
                .find(|(n, _)| n == name)
                .map(|(_, b)| b)
                .ok_or_else(|| {
                    TranslationError::UnknownProperty {
                        entity: "record".to_string(),
                        property: name.to_string(),
                        path: path.to_string(),
                    }
                    .into()
                }),
            Bound::Group { key, .. } => {
                if name == GROUP_KEY_MEMBER {
                    Ok(*key)
                } else {
                    Err(TranslationError::InvalidProjectionAfterGroupBy(path.to_string()).into())
                }
            }
            Bound::Lazy(inner) => self.lazy_member(state, *inner, name, path, navigates),
            other => Err(unsupported(format!(
                "member `{}` of a {} in `{}`",
                name,
                other.kind(),
                path
            ))),
        }
    }

    fn entity_member(
        &self,
        state: &mut QueryState,
        e: &EntityRef,
        name: &str,
        path: &Expr,
        role: ExprRole,
        navigates: bool,
    ) -> FlowResult<Bound> {
        let nav_err = match self.metadata.navigation_of(&e.entity, name) {
            Ok(nav) => return self.navigate(state, e, name, nav, role),
            Err(err) => err,
        };

        let info = match self.metadata.column_of(&e.entity, name) {
            Ok(info) => info,
            Err(err) => {
                let err = if navigates { nav_err } else { err };
                return Err(TranslationError::from_lookup(err, path.to_string()).into());
            }
        };
        let expr = e.column(&info.column);
        if e.grouped {
            state.scope.ensure_grouped(expr.clone());
        }
        Ok(Bound::scalar(expr, Some(name)))
    }

    fn navigate(
        &self,
        state: &mut QueryState,
        e: &EntityRef,
        name: &str,
        nav: NavigationInfo,
        role: ExprRole,
    ) -> FlowResult<Bound> {
        if nav.collection {
            return Ok(Bound::Collection {
                source: e.clone(),
                nav_name: name.to_string(),
                nav,
            });
        }
        if e.projected && self.conservative() {
            if e.grouped {
                state.scope.ensure_grouped(e.column(&nav.source_column));
            }
            log::debug!("Deferring navigation {}.{} of a projected entity", e.alias, name);
            return Ok(Bound::Deferred(DeferredNav {
                nav_name: name.to_string(),
                source_alias: e.alias.clone(),
                source_column: e.column_name(&nav.source_column),
                source_optional: e.optional,
                nav,
                exposed: false,
            }));
        }
        let target = self.join_navigation(&mut state.scope, e, name, &nav, role)?;
        Ok(Bound::Entity(target))
    }

    /// Lower a binding to a single SQL value. Entities and navigations
    /// compare by key.
    pub(super) fn value_of(
        &self,
        state: &mut QueryState,
        bound: Bound,
        role: ExprRole,
        path: &Expr,
    ) -> FlowResult<RenderExpr> {
        match bound {
            Bound::Scalar { expr, .. } => Ok(expr),
            Bound::Entity(e) => {
                let key = self.metadata.key_column_of(&e.entity)?;
                let expr = e.column(&key);
                if e.grouped {
                    state.scope.ensure_grouped(expr.clone());
                }
                Ok(expr)
            }
            Bound::Deferred(d) => Ok(d.source_key()),
            Bound::Lazy(inner) => self.lazy_value(state, *inner, role, path),
            Bound::Group { .. } => {
                Err(TranslationError::InvalidProjectionAfterGroupBy(path.to_string()).into())
            }
            other => Err(unsupported(format!(
                "a {} cannot be used as a value in `{}`",
                other.kind(),
                path
            ))),
        }
    }
}
