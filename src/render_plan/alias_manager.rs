//! Per-scope alias allocation.
//!
//! Table aliases are the lowercased first letter of the table name followed
//! by a counter local to that prefix (`b0`, `b1`, `p0`); subqueries share one
//! counter (`sq0`, `sq1`). Synthetic columns get `<Column>_jk<n>` for exposed
//! join keys and `<Base>_agg<n>` for exposed aggregates, counted per base name.
//!
//! Every [`Scope`](super::Scope) owns its own manager, so nested scopes start
//! again from zero.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasManager {
    tables: HashMap<String, usize>,
    subqueries: usize,
    join_keys: HashMap<String, usize>,
    aggregates: HashMap<String, usize>,
}

fn bump(counters: &mut HashMap<String, usize>, key: &str) -> usize {
    let slot = counters.entry(key.to_string()).or_insert(0);
    let n = *slot;
    *slot += 1;
    n
}

impl AliasManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_table_alias(&mut self, table: &str) -> String {
        let prefix = table_prefix(table);
        let n = bump(&mut self.tables, &prefix);
        format!("{}{}", prefix, n)
    }

    pub fn next_subquery_alias(&mut self) -> String {
        let n = self.subqueries;
        self.subqueries += 1;
        format!("sq{}", n)
    }

    pub fn next_join_key(&mut self, column: &str) -> String {
        let n = bump(&mut self.join_keys, column);
        format!("{}_jk{}", column, n)
    }

    pub fn next_aggregate(&mut self, base: &str) -> String {
        let n = bump(&mut self.aggregates, base);
        format!("{}_agg{}", base, n)
    }
}

fn table_prefix(table: &str) -> String {
    table
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase().to_string())
        .unwrap_or_else(|| "t".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_prefix() {
        let mut aliases = AliasManager::new();
        assert_eq!(aliases.next_table_alias("Blogs"), "b0");
        assert_eq!(aliases.next_table_alias("Posts"), "p0");
        assert_eq!(aliases.next_table_alias("Blogs"), "b1");
        assert_eq!(aliases.next_table_alias("bookmarks"), "b2");
        assert_eq!(aliases.next_table_alias("_1"), "t0");
    }

    #[test]
    fn test_subquery_and_synthetic_columns() {
        let mut aliases = AliasManager::new();
        assert_eq!(aliases.next_subquery_alias(), "sq0");
        assert_eq!(aliases.next_subquery_alias(), "sq1");
        assert_eq!(aliases.next_join_key("BlogId"), "BlogId_jk0");
        assert_eq!(aliases.next_join_key("UserId"), "UserId_jk0");
        assert_eq!(aliases.next_join_key("BlogId"), "BlogId_jk1");
        assert_eq!(aliases.next_aggregate("Count"), "Count_agg0");
    }

    #[test]
    fn test_fresh_manager_restarts() {
        let mut outer = AliasManager::new();
        outer.next_table_alias("Posts");
        let mut inner = AliasManager::new();
        assert_eq!(inner.next_table_alias("Posts"), "p0");
    }
}
