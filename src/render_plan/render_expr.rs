use serde::{Deserialize, Serialize};

pub use crate::query_planner::logical_expr::Literal;
use crate::query_planner::logical_expr::Operator as LogicalOperator;

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct TableAlias(pub String);

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct ColumnAlias(pub String);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum RenderExpr {
    Literal(Literal),

    PropertyAccessExp(PropertyAccess),

    /// `alias.*`
    TableStar(TableAlias),

    OperatorApplicationExp(OperatorApplication),

    AggregateFnCall(AggregateFnCall),

    ScalarFnCall(ScalarFnCall),

    Case(RenderCase),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PropertyAccess {
    pub table_alias: TableAlias,
    pub column: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Operator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    ModuloDivision,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
}

impl From<LogicalOperator> for Operator {
    fn from(value: LogicalOperator) -> Self {
        match value {
            LogicalOperator::Equal => Operator::Equal,
            LogicalOperator::NotEqual => Operator::NotEqual,
            LogicalOperator::LessThan => Operator::LessThan,
            LogicalOperator::LessThanEqual => Operator::LessThanEqual,
            LogicalOperator::GreaterThan => Operator::GreaterThan,
            LogicalOperator::GreaterThanEqual => Operator::GreaterThanEqual,
            LogicalOperator::And => Operator::And,
            LogicalOperator::Or => Operator::Or,
            LogicalOperator::Addition => Operator::Addition,
            LogicalOperator::Subtraction => Operator::Subtraction,
            LogicalOperator::Multiplication => Operator::Multiplication,
            LogicalOperator::Division => Operator::Division,
            LogicalOperator::ModuloDivision => Operator::ModuloDivision,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<RenderExpr>,
}

/// Aggregate call; an empty argument list renders as `name(*)`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregateFnCall {
    pub name: String,
    pub args: Vec<RenderExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ScalarFnCall {
    pub name: String,
    pub args: Vec<RenderExpr>,
}

/// Searched CASE without an else branch; unmatched rows yield null.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RenderCase {
    pub when_then: Vec<(RenderExpr, RenderExpr)>,
}

impl RenderExpr {
    pub fn column(table_alias: &str, column: &str) -> Self {
        RenderExpr::PropertyAccessExp(PropertyAccess {
            table_alias: TableAlias(table_alias.to_string()),
            column: column.to_string(),
        })
    }

    pub fn apply(operator: Operator, operands: Vec<RenderExpr>) -> Self {
        RenderExpr::OperatorApplicationExp(OperatorApplication { operator, operands })
    }

    pub fn equals(left: RenderExpr, right: RenderExpr) -> Self {
        Self::apply(Operator::Equal, vec![left, right])
    }

    pub fn is_null(expr: RenderExpr) -> Self {
        Self::apply(Operator::IsNull, vec![expr])
    }

    pub fn is_not_null(expr: RenderExpr) -> Self {
        Self::apply(Operator::IsNotNull, vec![expr])
    }

    pub fn negate(expr: RenderExpr) -> Self {
        Self::apply(Operator::Not, vec![expr])
    }

    /// Fold predicates into a left-deep `and` chain. Returns `None` when empty.
    pub fn conjunction(mut predicates: Vec<RenderExpr>) -> Option<RenderExpr> {
        if predicates.is_empty() {
            return None;
        }
        let first = predicates.remove(0);
        Some(
            predicates
                .into_iter()
                .fold(first, |acc, next| Self::apply(Operator::And, vec![acc, next])),
        )
    }

    pub fn coalesce(expr: RenderExpr, fallback: RenderExpr) -> Self {
        RenderExpr::ScalarFnCall(ScalarFnCall {
            name: "coalesce".to_string(),
            args: vec![expr, fallback],
        })
    }

    /// Column name when this is a plain column reference
    pub fn column_name(&self) -> Option<&str> {
        match self {
            RenderExpr::PropertyAccessExp(pa) => Some(pa.column.as_str()),
            _ => None,
        }
    }
}
