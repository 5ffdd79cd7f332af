use std::fmt;

use itertools::Itertools;

use super::ast::*;
use crate::engine::quote_identifier;

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)?;
        if !self.order_by.is_empty() {
            write!(f, "\nORDER BY {}", self.order_by.iter().join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.projection.is_empty() {
            write!(f, "*")?;
        } else {
            write!(f, "{}", self.projection.iter().join(", "))?;
        }
        write!(f, "\nFROM {}", self.from)?;
        for join in &self.joins {
            write!(f, "\n{}", join)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, "\nWHERE {}", selection)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => write!(f, "*"),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{} AS {}", expr, quote_identifier(alias)),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Derived { plan, alias } => {
                write!(f, "({}) AS {}", plan, quote_identifier(alias))
            }
            TableRef::Subquery { select, alias } => {
                write!(f, "({}) AS {}", select, quote_identifier(alias))
            }
        }
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.table)?;
        let JoinConstraint::On(expr) = &self.constraint;
        write!(f, " ON {}", expr)
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            JoinOperator::Inner => "INNER JOIN",
            JoinOperator::LeftOuter => "LEFT OUTER JOIN",
            JoinOperator::RightOuter => "RIGHT OUTER JOIN",
            JoinOperator::FullOuter => "FULL OUTER JOIN",
            JoinOperator::Semi => "SEMI JOIN",
            JoinOperator::Anti => "ANTI JOIN",
        };
        write!(f, "{}", keyword)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
        };
        write!(f, "{}", op)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(value) => write!(f, "{}", value),
            Literal::True => write!(f, "TRUE"),
            Literal::Interval { quantity, unit } => write!(f, "INTERVAL '{} {}'", quantity, unit),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column {
                qualifier: Some(qualifier),
                name,
            } => write!(f, "{}.{}", quote_identifier(qualifier), quote_identifier(name)),
            Expr::Column {
                qualifier: None,
                name,
            } => write!(f, "{}", quote_identifier(name)),
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Binary { left, op, right } => {
                write!(f, "{} {} {}", Operand(left), op, Operand(right))
            }
            Expr::And(predicates) => write!(f, "{}", predicates.iter().join(" AND ")),
            Expr::IsNotNull(expr) => write!(f, "{} IS NOT NULL", Operand(expr)),
            Expr::Exists { subquery, negated } => {
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "EXISTS ({})", subquery)
            }
            Expr::Coalesce(args) => write!(f, "COALESCE({})", args.iter().join(", ")),
            Expr::Case {
                condition,
                then,
                otherwise,
            } => write!(f, "CASE WHEN {} THEN {} ELSE {} END", condition, then, otherwise),
            Expr::RowNumber {
                partition_by,
                order_by,
            } => {
                let mut window = Vec::new();
                if !partition_by.is_empty() {
                    window.push(format!("PARTITION BY {}", partition_by.iter().join(", ")));
                }
                if !order_by.is_empty() {
                    window.push(format!("ORDER BY {}", order_by.iter().join(", ")));
                }
                write!(f, "row_number() OVER ({})", window.join(" "))
            }
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "DESC" } else { "ASC" };
        write!(f, "{} {}", self.expr, direction)
    }
}

/// Parenthesizes compound operands so nested operators keep their grouping.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Binary { .. } | Expr::And(_) => write!(f, "({})", self.0),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_exists_query() {
        let inner = Select::new(TableRef::Derived {
            plan: "SELECT * FROM \"t2\"".to_string(),
            alias: "r".to_string(),
        })
        .project([SelectItem::unnamed(Expr::integer(1))])
        .filter(Expr::and([Expr::eq(Expr::column("l", "id"), Expr::column("r", "id"))]));

        let outer = Select::new(TableRef::Derived {
            plan: "SELECT * FROM \"t1\"".to_string(),
            alias: "l".to_string(),
        })
        .project([SelectItem::aliased(Expr::column("l", "id"), "id")])
        .filter(Expr::exists(inner, true));

        let sql = Query::new(outer).to_string();
        assert_eq!(
            sql,
            "SELECT \"l\".\"id\" AS \"id\"\n\
             FROM (SELECT * FROM \"t1\") AS \"l\"\n\
             WHERE NOT EXISTS (SELECT 1\n\
             FROM (SELECT * FROM \"t2\") AS \"r\"\n\
             WHERE \"l\".\"id\" = \"r\".\"id\")"
        );
    }

    #[test]
    fn test_render_nested_subquery() {
        let numbered = Select::new(TableRef::Derived {
            plan: "SELECT * FROM \"l\"".to_string(),
            alias: "src".to_string(),
        })
        .project([
            SelectItem::Wildcard,
            SelectItem::aliased(
                Expr::RowNumber { partition_by: vec![], order_by: vec![] },
                "row",
            ),
        ]);
        let outer = Select::new(TableRef::subquery(numbered, "l"))
            .project([SelectItem::aliased(Expr::column("l", "row"), "row")])
            .filter(Expr::eq(Expr::column("l", "row"), Expr::integer(1)));

        assert_eq!(
            Query::new(outer).to_string(),
            "SELECT \"l\".\"row\" AS \"row\"\n\
             FROM (SELECT *, row_number() OVER () AS \"row\"\n\
             FROM (SELECT * FROM \"l\") AS \"src\") AS \"l\"\n\
             WHERE \"l\".\"row\" = 1"
        );
    }

    #[test]
    fn test_and_flattens_and_defaults_to_true() {
        assert_eq!(Expr::and(Vec::new()).to_string(), "TRUE");
        let nested = Expr::and([
            Expr::and([Expr::eq(Expr::integer(1), Expr::integer(1))]),
            Expr::and([
                Expr::eq(Expr::integer(2), Expr::integer(2)),
                Expr::eq(Expr::integer(3), Expr::integer(3)),
            ]),
        ]);
        assert_eq!(nested.to_string(), "1 = 1 AND 2 = 2 AND 3 = 3");
    }

    #[test]
    fn test_interval_arithmetic_is_parenthesized() {
        let bound = Expr::binary(
            Expr::column("r", "ts"),
            BinaryOperator::GtEq,
            Expr::binary(
                Expr::column("l", "ts"),
                BinaryOperator::Minus,
                Expr::Literal(Literal::Interval { quantity: 5, unit: "minutes" }),
            ),
        );
        assert_eq!(
            bound.to_string(),
            "\"r\".\"ts\" >= (\"l\".\"ts\" - INTERVAL '5 minutes')"
        );
    }

    #[test]
    fn test_row_number_window() {
        let expr = Expr::RowNumber {
            partition_by: vec![Expr::column("l", "__row")],
            order_by: vec![OrderBy::desc(Expr::column("r", "ts"))],
        };
        assert_eq!(
            expr.to_string(),
            "row_number() OVER (PARTITION BY \"l\".\"__row\" ORDER BY \"r\".\"ts\" DESC)"
        );
        let bare = Expr::RowNumber { partition_by: vec![], order_by: vec![] };
        assert_eq!(bare.to_string(), "row_number() OVER ()");
    }
}
