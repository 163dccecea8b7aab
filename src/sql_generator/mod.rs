//! SQL text generation for relational plans.

use crate::config::TranslatorConfig;
use crate::render_plan::Scope;

mod dialect;
mod to_sql_query;

pub use dialect::Dialect;
pub use to_sql_query::{SqlContext, ToSql};

pub fn generate_sql(plan: &Scope, config: &TranslatorConfig) -> String {
    to_sql_query::render_scope(plan, &SqlContext::new(config.dialect, config.indent_width))
}
