//! Expression AST consumed by the translator.
//!
//! Expressions are produced by an external front end from host-language
//! lambdas. Variables (`Var`) name lambda parameters; `Member` chains walk
//! properties, navigations, record fields and the `Key` of a group.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the member addressing a group's key.
pub const GROUP_KEY_MEMBER: &str = "Key";

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    ModuloDivision,
}

impl Operator {
    pub fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantifierKind {
    Any,
    All,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

impl AggregateFn {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Average => "avg",
        }
    }

    /// Base name for the column exposing this aggregate from a subquery
    pub fn column_base(self) -> &'static str {
        match self {
            AggregateFn::Count => "Count",
            AggregateFn::Sum => "Sum",
            AggregateFn::Min => "Min",
            AggregateFn::Max => "Max",
            AggregateFn::Average => "Average",
        }
    }
}

/// A single-parameter lambda, e.g. `p => p.Content != null`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Lambda {
    pub param: String,
    pub body: Box<Expr>,
}

impl Lambda {
    pub fn new(param: &str, body: Expr) -> Self {
        Lambda {
            param: param.to_string(),
            body: Box::new(body),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),

    /// A lambda parameter.
    Var(String),

    /// Property, navigation, record field or group key access.
    Member { target: Box<Expr>, name: String },

    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Not(Box<Expr>),

    /// `any`/`all` over a collection navigation.
    Quantifier {
        kind: QuantifierKind,
        collection: Box<Expr>,
        #[serde(default)]
        predicate: Option<Lambda>,
    },

    /// Aggregate over a group or a collection navigation. For `count` the
    /// lambda is a predicate, for every other function it selects the value.
    Aggregate {
        func: AggregateFn,
        source: Box<Expr>,
        #[serde(default)]
        lambda: Option<Lambda>,
    },
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    /// Parse a dotted path such as `p.Blog.User.UserName`.
    pub fn path(path: &str) -> Self {
        let mut parts = path.split('.');
        let root = Expr::var(parts.next().unwrap_or_default());
        parts.fold(root, |acc, part| acc.member(part))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn string(value: &str) -> Self {
        Expr::Literal(Literal::String(value.to_string()))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn member(self, name: &str) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.to_string(),
        }
    }

    pub fn binary(self, op: Operator, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    pub fn equals(self, rhs: Expr) -> Self {
        self.binary(Operator::Equal, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Self {
        self.binary(Operator::NotEqual, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Self {
        self.binary(Operator::LessThan, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Self {
        self.binary(Operator::GreaterThan, rhs)
    }

    pub fn and(self, rhs: Expr) -> Self {
        self.binary(Operator::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        self.binary(Operator::Or, rhs)
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn any(self) -> Self {
        self.quantifier(QuantifierKind::Any, None)
    }

    pub fn any_where(self, param: &str, predicate: Expr) -> Self {
        self.quantifier(QuantifierKind::Any, Some(Lambda::new(param, predicate)))
    }

    pub fn all_where(self, param: &str, predicate: Expr) -> Self {
        self.quantifier(QuantifierKind::All, Some(Lambda::new(param, predicate)))
    }

    fn quantifier(self, kind: QuantifierKind, predicate: Option<Lambda>) -> Self {
        Expr::Quantifier {
            kind,
            collection: Box::new(self),
            predicate,
        }
    }

    pub fn count(self) -> Self {
        self.aggregate(AggregateFn::Count, None)
    }

    pub fn count_where(self, param: &str, predicate: Expr) -> Self {
        self.aggregate(AggregateFn::Count, Some(Lambda::new(param, predicate)))
    }

    pub fn aggregate(self, func: AggregateFn, lambda: Option<Lambda>) -> Self {
        Expr::Aggregate {
            func,
            source: Box::new(self),
            lambda,
        }
    }

    pub fn max(self, param: &str, selector: Expr) -> Self {
        self.aggregate(AggregateFn::Max, Some(Lambda::new(param, selector)))
    }

    pub fn sum(self, param: &str, selector: Expr) -> Self {
        self.aggregate(AggregateFn::Sum, Some(Lambda::new(param, selector)))
    }

    /// The name an anonymous-object member gets when none is given: the last
    /// member name of an access chain.
    pub fn natural_name(&self) -> Option<&str> {
        match self {
            Expr::Member { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Null) => write!(f, "null"),
            Expr::Literal(Literal::Boolean(b)) => write!(f, "{}", b),
            Expr::Literal(Literal::Integer(i)) => write!(f, "{}", i),
            Expr::Literal(Literal::Float(x)) => write!(f, "{}", x),
            Expr::Literal(Literal::String(s)) => write!(f, "\"{}\"", s),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Member { target, name } => write!(f, "{}.{}", target, name),
            Expr::Binary { op, left, right } => write!(f, "({} {:?} {})", left, op, right),
            Expr::Not(inner) => write!(f, "!({})", inner),
            Expr::Quantifier {
                kind,
                collection,
                predicate,
            } => match predicate {
                Some(l) => write!(f, "{}.{:?}({} => {})", collection, kind, l.param, l.body),
                None => write!(f, "{}.{:?}()", collection, kind),
            },
            Expr::Aggregate {
                func,
                source,
                lambda,
            } => match lambda {
                Some(l) => write!(f, "{}.{:?}({} => {})", source, func, l.param, l.body),
                None => write!(f, "{}.{:?}()", source, func),
            },
        }
    }
}
