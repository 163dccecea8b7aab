use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ParseVariantError;

/// Identifier quoting convention of the target database.
///
/// | dialect     | column      | output alias | table   |
/// |-------------|-------------|--------------|---------|
/// | `sqlite`    | `Col`       | `'Col'`      | `Posts` |
/// | `quoted`    | `'Col'`     | `'Col'`      | `Posts` |
/// | `postgres`  | `"Col"`     | `"Col"`      | `"Posts"` |
/// | `mysql`     | `` `Col` `` | `` `Col` ``  | `` `Posts` `` |
/// | `sqlserver` | `[Col]`     | `[Col]`      | `[Posts]` |
///
/// Table aliases (`p0`, `sq1`) are never quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    #[default]
    Quoted,
    Postgres,
    Mysql,
    #[serde(rename = "sqlserver")]
    SqlServer,
}

impl Dialect {
    pub fn quote_column(self, name: &str) -> String {
        match self {
            Dialect::Sqlite => name.to_string(),
            _ => self.quote(name),
        }
    }

    pub fn quote_alias(self, name: &str) -> String {
        self.quote(name)
    }

    pub fn quote_table(self, name: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Quoted => name.to_string(),
            _ => self.quote(name),
        }
    }

    fn quote(self, name: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Quoted => format!("'{}'", name.replace('\'', "''")),
            Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
            Dialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
        }
    }
}

impl FromStr for Dialect {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "quoted" => Ok(Dialect::Quoted),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::Mysql),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            _ => Err(ParseVariantError::new("dialect", s)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Quoted => "quoted",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::SqlServer => "sqlserver",
        };
        write!(f, "{}", name)
    }
}
