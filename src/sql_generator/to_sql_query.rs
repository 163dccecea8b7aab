use crate::render_plan::render_expr::{
    AggregateFnCall, ColumnAlias, Literal, Operator, OperatorApplication, PropertyAccess,
    RenderCase, RenderExpr, ScalarFnCall, TableAlias,
};
use crate::render_plan::{FromSource, Join, JoinTarget, JoinType, Scope, SelectItem};

use super::dialect::Dialect;

/// Rendering settings threaded through nested scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlContext {
    pub dialect: Dialect,
    pub indent_width: usize,
    pub depth: usize,
}

impl SqlContext {
    pub fn new(dialect: Dialect, indent_width: usize) -> Self {
        SqlContext {
            dialect,
            indent_width,
            depth: 0,
        }
    }

    fn nested(self) -> Self {
        SqlContext {
            depth: self.depth + 1,
            ..self
        }
    }

    fn indent(&self) -> String {
        " ".repeat(self.indent_width * self.depth)
    }
}

/// Convert a plan node to SQL text
pub trait ToSql {
    fn to_sql(&self, ctx: &SqlContext) -> String;
}

pub fn render_scope(scope: &Scope, ctx: &SqlContext) -> String {
    log::debug!(
        "Rendering scope {} at depth {} ({} join(s))",
        scope.root_alias(),
        ctx.depth,
        scope.joins.len()
    );
    scope.to_sql(ctx)
}

impl ToSql for Scope {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        let pad = ctx.indent();
        let mut lines: Vec<String> = Vec::new();

        let items: Vec<String> = self.select.iter().map(|item| item.to_sql(ctx)).collect();
        if items.is_empty() {
            lines.push(format!("{}select *", pad));
        } else {
            lines.push(format!("{}select {}", pad, items.join(", ")));
        }

        lines.push(format!("{}from {}", pad, self.from.to_sql(ctx)));

        for join in &self.joins {
            lines.push(format!("{}{}", pad, join.to_sql(ctx)));
        }

        if let Some(predicate) = self.predicate() {
            lines.push(format!("{}where {}", pad, predicate.to_sql(ctx)));
        }

        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|k| k.to_sql(ctx)).collect();
            lines.push(format!("{}group by {}", pad, keys.join(", ")));
        }

        if let Some(having) = self.having_predicate() {
            lines.push(format!("{}having {}", pad, having.to_sql(ctx)));
        }

        lines.join("\n")
    }
}

impl ToSql for SelectItem {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        let expr = self.expression.to_sql(ctx);
        match &self.col_alias {
            Some(ColumnAlias(name)) if self.expression.column_name() != Some(name.as_str()) => {
                format!("{} as {}", expr, ctx.dialect.quote_alias(name))
            }
            _ => expr,
        }
    }
}

/// `(\n<inner>\n) alias`, with the closing parenthesis at the outer indent.
fn subquery(scope: &Scope, alias: &str, ctx: &SqlContext) -> String {
    format!(
        "(\n{}\n{}) {}",
        render_scope(scope, &ctx.nested()),
        ctx.indent(),
        alias
    )
}

impl ToSql for FromSource {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        match self {
            FromSource::Table { name, alias } => {
                format!("{} {}", ctx.dialect.quote_table(name), alias)
            }
            FromSource::Subquery { scope, alias } => subquery(scope, alias, ctx),
        }
    }
}

impl ToSql for Join {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        let join_type_str = match self.join_type {
            JoinType::Inner => "inner join",
            JoinType::Left => "left outer join",
            JoinType::Right => "right outer join",
        };
        let target = match &self.target {
            JoinTarget::Table(name) => format!("{} {}", ctx.dialect.quote_table(name), self.alias),
            JoinTarget::Subquery(scope) => subquery(scope, &self.alias, ctx),
        };
        format!(
            "{} {} on {}",
            join_type_str,
            target,
            self.joining_on.to_sql(ctx)
        )
    }
}

impl ToSql for Literal {
    fn to_sql(&self, _ctx: &SqlContext) -> String {
        match self {
            Literal::Null => "null".to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl ToSql for RenderExpr {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        match self {
            RenderExpr::Literal(lit) => lit.to_sql(ctx),
            RenderExpr::PropertyAccessExp(PropertyAccess {
                table_alias: TableAlias(alias),
                column,
            }) => format!("{}.{}", alias, ctx.dialect.quote_column(column)),
            RenderExpr::TableStar(TableAlias(alias)) => format!("{}.*", alias),
            RenderExpr::OperatorApplicationExp(op) => op.to_sql(ctx),
            RenderExpr::AggregateFnCall(AggregateFnCall { name, args }) => {
                if args.is_empty() {
                    format!("{}(*)", name)
                } else {
                    format!("{}({})", name, join_args(args, ctx))
                }
            }
            RenderExpr::ScalarFnCall(ScalarFnCall { name, args }) => {
                format!("{}({})", name, join_args(args, ctx))
            }
            RenderExpr::Case(case) => case.to_sql(ctx),
        }
    }
}

fn join_args(args: &[RenderExpr], ctx: &SqlContext) -> String {
    args.iter()
        .map(|a| a.to_sql(ctx))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Operand text, parenthesised when it is itself an operator application.
fn operand(expr: &RenderExpr, ctx: &SqlContext) -> String {
    match expr {
        RenderExpr::OperatorApplicationExp(_) => format!("({})", expr.to_sql(ctx)),
        _ => expr.to_sql(ctx),
    }
}

impl ToSql for OperatorApplication {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        fn op_str(o: Operator) -> &'static str {
            match o {
                Operator::Addition => "+",
                Operator::Subtraction => "-",
                Operator::Multiplication => "*",
                Operator::Division => "/",
                Operator::ModuloDivision => "%",
                Operator::Equal => "=",
                Operator::NotEqual => "<>",
                Operator::LessThan => "<",
                Operator::GreaterThan => ">",
                Operator::LessThanEqual => "<=",
                Operator::GreaterThanEqual => ">=",
                Operator::And => "and",
                Operator::Or => "or",
                Operator::Not => "not",
                Operator::IsNull => "is null",
                Operator::IsNotNull => "is not null",
            }
        }

        match (self.operator, self.operands.as_slice()) {
            (Operator::Not, [inner]) => format!("not ({})", inner.to_sql(ctx)),
            (Operator::IsNull | Operator::IsNotNull, [inner]) => {
                format!("{} {}", operand(inner, ctx), op_str(self.operator))
            }
            // `= null` never holds in SQL
            (Operator::Equal | Operator::NotEqual, [value, RenderExpr::Literal(Literal::Null)])
            | (Operator::Equal | Operator::NotEqual, [RenderExpr::Literal(Literal::Null), value]) => {
                let test = if self.operator == Operator::Equal {
                    "is null"
                } else {
                    "is not null"
                };
                format!("{} {}", operand(value, ctx), test)
            }
            (Operator::And | Operator::Or, operands) => operands
                .iter()
                .map(|o| format!("({})", o.to_sql(ctx)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op_str(self.operator))),
            (_, operands) => operands
                .iter()
                .map(|o| operand(o, ctx))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op_str(self.operator))),
        }
    }
}

impl ToSql for RenderCase {
    fn to_sql(&self, ctx: &SqlContext) -> String {
        let mut sql = String::from("case");
        for (when, then) in &self.when_then {
            sql.push_str(&format!(" when {} then {}", when.to_sql(ctx), then.to_sql(ctx)));
        }
        sql.push_str(" end");
        sql
    }
}
