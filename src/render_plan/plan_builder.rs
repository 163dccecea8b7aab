//! Operator-chain driver.
//!
//! Operators are applied left to right. Each one runs against a copy of the
//! translation state; when it reports that the current scope cannot express
//! it, the untouched state is frozen into a subquery and the operator is
//! applied once more against the wrapper.

use crate::config::FlattenPolicy;
use crate::entity_catalog::EntityMetadata;
use crate::query_planner::logical_plan::{QueryChain, QueryOp};
use crate::query_planner::typed_variable::{Bound, EntityRef, Env, ExprRole};

use super::errors::{Flow, FlowResult, TranslationError};
use super::Scope;

/// Translate a query chain into a relational plan.
pub fn translate(
    chain: &QueryChain,
    metadata: &dyn EntityMetadata,
    policy: FlattenPolicy,
) -> Result<Scope, TranslationError> {
    QueryTranslator::new(metadata, policy).translate(chain)
}

pub struct QueryTranslator<'a> {
    pub(super) metadata: &'a dyn EntityMetadata,
    pub(super) policy: FlattenPolicy,
}

/// Scope under construction plus the binding of its current row.
#[derive(Debug, Clone)]
pub(super) struct QueryState {
    pub scope: Scope,
    pub row: Bound,
    /// A `Select` (or manual join result) has shaped the row
    pub projection_applied: bool,
    /// Inner side of a manual join while its condition and result are translated
    pub pending: Option<Box<PendingJoin>>,
}

#[derive(Debug, Clone)]
pub(super) struct PendingJoin {
    pub state: QueryState,
    pub alias: String,
    /// Inner values may be absent (left outer join)
    pub optional: bool,
}

impl QueryState {
    pub(super) fn from_entity(
        metadata: &dyn EntityMetadata,
        entity: &str,
    ) -> Result<Self, TranslationError> {
        let table = metadata.table_of(entity)?;
        let scope = Scope::from_table(&table);
        let root = EntityRef::table(entity, scope.root_alias());
        Ok(QueryState {
            scope,
            row: Bound::Entity(root),
            projection_applied: false,
            pending: None,
        })
    }
}

impl<'a> QueryTranslator<'a> {
    pub fn new(metadata: &'a dyn EntityMetadata, policy: FlattenPolicy) -> Self {
        QueryTranslator { metadata, policy }
    }

    pub fn translate(&self, chain: &QueryChain) -> Result<Scope, TranslationError> {
        log::debug!("Translating {}", chain);
        chain.validate()?;
        let state = self.run_chain(chain)?;
        self.finish(state)
    }

    pub(super) fn run_chain(&self, chain: &QueryChain) -> Result<QueryState, TranslationError> {
        let mut state = QueryState::from_entity(self.metadata, &chain.source)?;
        for op in &chain.ops {
            state = self.apply(state, op)?;
        }
        Ok(state)
    }

    fn apply(&self, state: QueryState, op: &QueryOp) -> Result<QueryState, TranslationError> {
        match self.apply_op(state.clone(), op) {
            Ok(next) => Ok(next),
            Err(Flow::Failed(err)) => Err(err),
            Err(Flow::Wrap) => {
                log::debug!("{} cannot be flattened, wrapping the current scope", op.name());
                let wrapped = self.freeze(state)?;
                self.apply_op(wrapped, op)
                    .map_err(|flow| flow.into_error(op.name()))
            }
        }
    }

    fn apply_op(&self, mut state: QueryState, op: &QueryOp) -> FlowResult<QueryState> {
        match op {
            QueryOp::Filter { param, predicate } => {
                let env = Env::new().bind(param, state.row.clone());
                let condition =
                    self.translate_value(&mut state, &env, predicate, ExprRole::Filter)?;
                if state.scope.is_grouped() || state.row.is_group() {
                    state.scope.having.push(condition);
                } else {
                    state.scope.filters.push(condition);
                }
                Ok(state)
            }
            QueryOp::Select { param, selector } => {
                let env = Env::new().bind(param, state.row.clone());
                let mut row =
                    self.resolve_selector(&mut state, &env, selector, ExprRole::Projection)?;
                row.mark_projected();
                state.row = row;
                state.projection_applied = true;
                Ok(state)
            }
            QueryOp::GroupBy { param, key } => self.group_by(state, param, key),
            QueryOp::Join {
                inner,
                outer_param,
                inner_param,
                condition,
                result,
                kind,
            } => self.manual_join(
                state,
                inner,
                (outer_param, inner_param),
                condition,
                result,
                *kind,
            ),
        }
    }

    pub(super) fn conservative(&self) -> bool {
        self.policy == FlattenPolicy::Conservative
    }
}
