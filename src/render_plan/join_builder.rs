//! Join Builder Module
//!
//! Resolves single-valued navigations into joins of the current scope.
//!
//! Key responsibilities:
//! - Reuse the join of a navigation already taken from the same source alias
//! - Pick the join kind from the navigation's cardinality, the optionality of
//!   its source, and the clause the navigation appears in
//! - Join deferred navigations once their foreign key is visible

use crate::entity_catalog::NavigationInfo;
use crate::query_planner::typed_variable::{Backing, DeferredNav, EntityRef, ExprRole};

use super::errors::TranslationError;
use super::plan_builder::QueryTranslator;
use super::render_expr::RenderExpr;
use super::{Join, JoinTarget, JoinType, Scope};

/// Join kind for one navigation hop.
///
/// Filters and join conditions may use an inner join when the foreign key is
/// required and nothing upstream is optional. Projections never drop rows.
pub(super) fn join_kind(nav: &NavigationInfo, source_optional: bool, role: ExprRole) -> JoinType {
    match role {
        ExprRole::Filter | ExprRole::JoinCondition
            if nav.required && !nav.collection && !source_optional =>
        {
            JoinType::Inner
        }
        _ => JoinType::Left,
    }
}

impl QueryTranslator<'_> {
    pub(super) fn join_navigation(
        &self,
        scope: &mut Scope,
        source: &EntityRef,
        nav_name: &str,
        nav: &NavigationInfo,
        role: ExprRole,
    ) -> Result<EntityRef, TranslationError> {
        let kind = join_kind(nav, source.optional, role);
        let mut target = self.add_navigation_join(
            scope,
            &source.alias,
            source.column(&nav.source_column),
            nav_name,
            nav,
            kind,
        )?;
        if source.optional {
            target.optional = true;
        }
        target.grouped = source.grouped;
        Ok(target)
    }

    /// Join a deferred navigation whose foreign key is visible in `scope`.
    pub(super) fn materialise(
        &self,
        scope: &mut Scope,
        deferred: &DeferredNav,
        role: ExprRole,
    ) -> Result<EntityRef, TranslationError> {
        let kind = join_kind(&deferred.nav, deferred.source_optional, role);
        let mut target = self.add_navigation_join(
            scope,
            &deferred.source_alias,
            deferred.source_key(),
            &deferred.nav_name,
            &deferred.nav,
            kind,
        )?;
        if deferred.source_optional {
            target.optional = true;
        }
        Ok(target)
    }

    fn add_navigation_join(
        &self,
        scope: &mut Scope,
        source_alias: &str,
        source_key: RenderExpr,
        nav_name: &str,
        nav: &NavigationInfo,
        kind: JoinType,
    ) -> Result<EntityRef, TranslationError> {
        let cache_key = (source_alias.to_string(), nav_name.to_string());
        if let Some(existing) = scope.join_cache.get(&cache_key) {
            log::debug!(
                "Reusing join {} for {}.{}",
                existing.alias,
                source_alias,
                nav_name
            );
            return Ok(existing.clone());
        }

        let table = self.metadata.table_of(&nav.target_entity)?;
        let alias = scope.aliases.next_table_alias(&table);
        log::debug!(
            "Joining {} {} for {}.{} ({:?})",
            table,
            alias,
            source_alias,
            nav_name,
            kind
        );
        scope.joins.push(Join {
            join_type: kind,
            target: JoinTarget::Table(table),
            alias: alias.clone(),
            joining_on: RenderExpr::equals(
                source_key,
                RenderExpr::column(&alias, &nav.target_column),
            ),
        });

        let target = EntityRef {
            entity: nav.target_entity.clone(),
            alias,
            backing: Backing::Table,
            optional: kind != JoinType::Inner,
            projected: false,
            grouped: false,
            renamed: vec![],
        };
        scope.join_cache.insert(cache_key, target.clone());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(required: bool, collection: bool) -> NavigationInfo {
        NavigationInfo {
            target_entity: "User".to_string(),
            source_column: "UserId".to_string(),
            target_column: "UserId".to_string(),
            required,
            collection,
        }
    }

    #[test]
    fn test_required_hop_in_filter_is_inner() {
        assert_eq!(join_kind(&nav(true, false), false, ExprRole::Filter), JoinType::Inner);
        assert_eq!(
            join_kind(&nav(true, false), false, ExprRole::JoinCondition),
            JoinType::Inner
        );
    }

    #[test]
    fn test_optionality_is_transitive() {
        assert_eq!(join_kind(&nav(true, false), true, ExprRole::Filter), JoinType::Left);
    }

    #[test]
    fn test_optional_and_projected_hops_are_left() {
        assert_eq!(join_kind(&nav(false, false), false, ExprRole::Filter), JoinType::Left);
        assert_eq!(
            join_kind(&nav(true, false), false, ExprRole::Projection),
            JoinType::Left
        );
    }
}
