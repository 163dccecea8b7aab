//! entsql - translate entity query operator chains into SQL
//!
//! This crate turns a chain of query operators over an entity model
//! (filter, projection, group-by, explicit join) into a single SQL `SELECT`:
//! - Navigation properties become joins, reused per path
//! - `Any`/`All` and collection aggregates are decorrelated into joins
//!   against grouped subqueries
//! - Consecutive projections are flattened into one scope where possible
//! - Rendering is dialect aware

use serde::Serialize;

pub mod config;
pub mod entity_catalog;
pub mod query_planner;
pub mod render_plan;
pub mod sql_generator;

use config::TranslatorConfig;
use entity_catalog::EntityMetadata;
use query_planner::logical_plan::QueryChain;
use render_plan::errors::TranslationError;
use render_plan::Scope;

/// Result of translating one query: the relational plan and its SQL text.
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub plan: Scope,
    pub sql: String,
}

/// Translate `chain` against `metadata` and render it with `config`.
pub fn translate_to_sql(
    chain: &QueryChain,
    metadata: &dyn EntityMetadata,
    config: &TranslatorConfig,
) -> Result<Translation, TranslationError> {
    let plan = render_plan::translate(chain, metadata, config.flatten_policy)?;
    let sql = sql_generator::generate_sql(&plan, config);
    log::debug!("Generated SQL:\n{}", sql);
    Ok(Translation { plan, sql })
}
