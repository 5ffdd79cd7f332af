//! As-of Join Planning
//!
//! Every as-of join runs as one ranking query. The left input is numbered and
//! left-joined to every right row that satisfies the grouping, direction and
//! tolerance predicates. Candidates are ranked per left row and only the best one
//! is kept:
//!
//! ```text
//! SELECT m.<left columns>, m.<extra>
//! FROM (SELECT l.<left columns>, l.<row>, r.<extra>,
//!              row_number() OVER (PARTITION BY l.<row> ORDER BY <rank>) AS <rank>
//!       FROM (SELECT *, row_number() OVER () AS <row> FROM (<left>) AS "src") AS "l"
//!       LEFT OUTER JOIN (<right>) AS "r" ON <by> AND <direction> AND <tolerance>) AS "m"
//! WHERE m.<rank> = 1
//! ORDER BY m.<row>
//! ```
//!
//! Only derived tables are used, so a table named like one of the aliases
//! inside either input still resolves to that table.
//!
//! Unmatched left rows survive with null right columns, so the output always has
//! exactly as many rows as the left input.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::columns::{output_projection, unused_name, ColumnSet};
use super::synthesize::{self, derived, LEFT, MATCHES, RIGHT};
use super::validate::JoinKeyValidator;
use crate::engine::Relation;
use crate::error::{DuckPlusError, Result};
use crate::sql::{
    BinaryOperator, Expr, Join, JoinConstraint, JoinOperator, Literal, OrderBy, Query,
    Select, SelectItem, TableRef,
};

lazy_static! {
    static ref TOLERANCE: Regex = Regex::new(r"^\s*(\d+)\s*([A-Za-z]+)\s*$").unwrap();
}

const SOURCE_ALIAS: &str = "src";
const ROW_COLUMN: &str = "__asof_row";
const RANK_COLUMN: &str = "__asof_rank";

/// Which right rows qualify for a left row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsofDirection {
    /// Greatest right value not after the left value
    #[default]
    Backward,
    /// Smallest right value not before the left value
    Forward,
    /// Closest right value on either side; ties go to the earlier one
    Nearest,
}

impl FromStr for AsofDirection {
    type Err = DuckPlusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "backward" | ">=" => Ok(AsofDirection::Backward),
            "forward" | "<=" => Ok(AsofDirection::Forward),
            "nearest" => Ok(AsofDirection::Nearest),
            _ => Err(DuckPlusError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for AsofDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AsofDirection::Backward => "backward",
            AsofDirection::Forward => "forward",
            AsofDirection::Nearest => "nearest",
        };
        write!(f, "{}", name)
    }
}

/// Units an interval literal may be written in. Weeks are stored as days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl IntervalUnit {
    fn sql_name(&self) -> &'static str {
        match self {
            IntervalUnit::Microsecond => "microseconds",
            IntervalUnit::Millisecond => "milliseconds",
            IntervalUnit::Second => "seconds",
            IntervalUnit::Minute => "minutes",
            IntervalUnit::Hour => "hours",
            IntervalUnit::Day => "days",
        }
    }

    /// Largest quantity the engine can hold in this unit.
    fn max_quantity(&self) -> u64 {
        const MICROS: u64 = i64::MAX as u64;
        match self {
            IntervalUnit::Microsecond => MICROS,
            IntervalUnit::Millisecond => MICROS / 1_000,
            IntervalUnit::Second => MICROS / 1_000_000,
            IntervalUnit::Minute => MICROS / 60_000_000,
            IntervalUnit::Hour => MICROS / 3_600_000_000,
            IntervalUnit::Day => i32::MAX as u64,
        }
    }
}

/// Maximum distance between matched values, e.g. `"5 minutes"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    quantity: u64,
    unit: IntervalUnit,
}

impl Tolerance {
    pub fn new(quantity: u64, unit: IntervalUnit) -> Result<Self> {
        if quantity > unit.max_quantity() {
            return Err(DuckPlusError::InvalidTolerance(format!(
                "{} {} is out of range",
                quantity,
                unit.sql_name()
            )));
        }
        Ok(Self { quantity, unit })
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// Engine-native interval literal.
    pub fn to_literal(&self) -> Literal {
        Literal::Interval {
            quantity: self.quantity,
            unit: self.unit.sql_name(),
        }
    }
}

impl FromStr for Tolerance {
    type Err = DuckPlusError;

    fn from_str(s: &str) -> Result<Self> {
        let captures = TOLERANCE.captures(s).ok_or_else(|| {
            DuckPlusError::InvalidTolerance(format!("'{}' is not '<integer> <unit>'", s))
        })?;
        let quantity: u64 = captures[1]
            .parse()
            .map_err(|_| DuckPlusError::InvalidTolerance(format!("'{}' is out of range", s)))?;

        let (quantity, unit) = match captures[2].to_lowercase().as_str() {
            "microsecond" | "microseconds" | "us" => (quantity, IntervalUnit::Microsecond),
            "millisecond" | "milliseconds" | "ms" => (quantity, IntervalUnit::Millisecond),
            "second" | "seconds" | "s" | "sec" => (quantity, IntervalUnit::Second),
            "minute" | "minutes" | "m" | "min" => (quantity, IntervalUnit::Minute),
            "hour" | "hours" | "h" | "hr" => (quantity, IntervalUnit::Hour),
            "day" | "days" | "d" => (quantity, IntervalUnit::Day),
            "week" | "weeks" | "w" => {
                let days = quantity.checked_mul(7).ok_or_else(|| {
                    DuckPlusError::InvalidTolerance(format!("'{}' is out of range", s))
                })?;
                (days, IntervalUnit::Day)
            }
            other => {
                return Err(DuckPlusError::InvalidTolerance(format!(
                    "unknown unit '{}'",
                    other
                )))
            }
        };
        Tolerance::new(quantity, unit)
    }
}

impl TryFrom<Duration> for Tolerance {
    type Error = DuckPlusError;

    /// Whole seconds when possible, microseconds otherwise (sub-microsecond
    /// precision is truncated).
    fn try_from(duration: Duration) -> Result<Self> {
        if duration.subsec_nanos() == 0 {
            return Tolerance::new(duration.as_secs(), IntervalUnit::Second);
        }
        let micros = u64::try_from(duration.as_micros()).map_err(|_| {
            DuckPlusError::InvalidTolerance(format!("{:?} is out of range", duration))
        })?;
        Tolerance::new(micros, IntervalUnit::Microsecond)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.unit.sql_name())
    }
}

/// One as-of join request: comparison column, grouping keys, direction and
/// optional tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsofSpec {
    on: String,
    by: Vec<String>,
    direction: AsofDirection,
    tolerance: Option<Tolerance>,
}

impl AsofSpec {
    pub fn new(on: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            by: Vec::new(),
            direction: AsofDirection::default(),
            tolerance: None,
        }
    }

    pub fn with_by<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.by = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self
    }

    pub fn with_direction(mut self, direction: AsofDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Build a spec from the string forms callers usually have at hand.
    pub fn parse<S: AsRef<str>>(
        on: &str,
        by: &[S],
        direction: &str,
        tolerance: Option<&str>,
    ) -> Result<Self> {
        let mut spec = AsofSpec::new(on).with_by(by).with_direction(direction.parse()?);
        if let Some(tolerance) = tolerance {
            spec = spec.with_tolerance(tolerance.parse()?);
        }
        Ok(spec)
    }

    pub fn on(&self) -> &str {
        &self.on
    }

    pub fn by(&self) -> &[String] {
        &self.by
    }

    pub fn direction(&self) -> AsofDirection {
        self.direction
    }

    pub fn tolerance(&self) -> Option<Tolerance> {
        self.tolerance
    }
}

/// Validate `spec` against both inputs, then run the ranking query.
pub fn plan(left: &Relation, right: &Relation, spec: &AsofSpec) -> Result<Relation> {
    let validator = JoinKeyValidator::for_relations(left, right);
    validator.check_columns(std::slice::from_ref(&spec.on))?;
    validator.check_columns(&spec.by)?;

    if let Some(tolerance) = &spec.tolerance {
        let temporal = |relation: &Relation| {
            relation
                .field(&spec.on)
                .map(|field| field.is_temporal())
                .unwrap_or(false)
        };
        if !temporal(left) || !temporal(right) {
            return Err(DuckPlusError::InvalidTolerance(format!(
                "'{}' needs a temporal '{}' column on both sides",
                tolerance, spec.on
            )));
        }
    }

    debug!(
        "As-of {} join on {} by {:?} (tolerance: {:?})",
        spec.direction,
        spec.on,
        spec.by,
        spec.tolerance.map(|t| t.to_string())
    );
    let query = ranking_query(left, right, spec);
    synthesize::execute(left, &query)
}

fn ranking_query(left: &Relation, right: &Relation, spec: &AsofSpec) -> Query {
    let left_set = ColumnSet::new(left.columns());
    let right_set = ColumnSet::new(right.columns());
    let row = unused_name(ROW_COLUMN, &[&left_set, &right_set]);
    let rank = unused_name(RANK_COLUMN, &[&left_set, &right_set]);
    let extra = output_projection(left.columns(), right.columns()).right;

    let numbered = Select::new(derived(left, SOURCE_ALIAS)).project([
        SelectItem::Wildcard,
        SelectItem::aliased(
            Expr::RowNumber {
                partition_by: Vec::new(),
                order_by: Vec::new(),
            },
            row.as_str(),
        ),
    ]);

    let l_on = || Expr::column(LEFT, &spec.on);
    let r_on = || Expr::column(RIGHT, &spec.on);

    let mut predicates: Vec<Expr> = spec
        .by
        .iter()
        .map(|key| Expr::eq(Expr::column(LEFT, key), Expr::column(RIGHT, key)))
        .collect();
    let (direction, rank_order) = match spec.direction {
        AsofDirection::Backward => (
            Expr::binary(l_on(), BinaryOperator::GtEq, r_on()),
            vec![OrderBy::desc(r_on())],
        ),
        AsofDirection::Forward => (
            Expr::binary(l_on(), BinaryOperator::LtEq, r_on()),
            vec![OrderBy::asc(r_on())],
        ),
        AsofDirection::Nearest => {
            let distance = Expr::case(
                Expr::binary(r_on(), BinaryOperator::LtEq, l_on()),
                Expr::binary(l_on(), BinaryOperator::Minus, r_on()),
                Expr::binary(r_on(), BinaryOperator::Minus, l_on()),
            );
            (
                Expr::and([Expr::is_not_null(l_on()), Expr::is_not_null(r_on())]),
                vec![OrderBy::asc(distance), OrderBy::asc(r_on())],
            )
        }
    };
    predicates.push(direction);

    if let Some(tolerance) = &spec.tolerance {
        let interval = || Expr::Literal(tolerance.to_literal());
        let lower = || {
            Expr::binary(
                r_on(),
                BinaryOperator::GtEq,
                Expr::binary(l_on(), BinaryOperator::Minus, interval()),
            )
        };
        let upper = || {
            Expr::binary(
                r_on(),
                BinaryOperator::LtEq,
                Expr::binary(l_on(), BinaryOperator::Plus, interval()),
            )
        };
        match spec.direction {
            AsofDirection::Backward => predicates.push(lower()),
            AsofDirection::Forward => predicates.push(upper()),
            AsofDirection::Nearest => {
                predicates.push(lower());
                predicates.push(upper());
            }
        }
    }

    let mut candidate_items = left
        .columns()
        .iter()
        .chain(std::iter::once(&row))
        .map(|column| SelectItem::aliased(Expr::column(LEFT, column), column.as_str()))
        .collect::<Vec<_>>();
    candidate_items.extend(
        extra
            .iter()
            .map(|column| SelectItem::aliased(Expr::column(RIGHT, column), column.as_str())),
    );
    candidate_items.push(SelectItem::aliased(
        Expr::RowNumber {
            partition_by: vec![Expr::column(LEFT, &row)],
            order_by: rank_order,
        },
        rank.as_str(),
    ));
    let candidates = Select::new(TableRef::subquery(numbered, LEFT))
        .project(candidate_items)
        .join(Join {
            operator: JoinOperator::LeftOuter,
            table: derived(right, RIGHT),
            constraint: JoinConstraint::On(Expr::and(predicates)),
        });

    let output = left
        .columns()
        .iter()
        .chain(extra.iter())
        .map(|column| SelectItem::aliased(Expr::column(MATCHES, column), column.as_str()));
    let body = Select::new(TableRef::subquery(candidates, MATCHES))
        .project(output)
        .filter(Expr::eq(Expr::column(MATCHES, &rank), Expr::integer(1)));

    Query::new(body).order_by(OrderBy::asc(Expr::column(MATCHES, &row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Connection;
    use sqlparser::dialect::DuckDbDialect;
    use sqlparser::parser::Parser;

    fn relations() -> (Relation, Relation) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE trades (sym VARCHAR, ts TIMESTAMP, price DOUBLE);
             CREATE TABLE quotes (sym VARCHAR, ts TIMESTAMP, bid DOUBLE, \"__asof_row\" INTEGER);",
        )
        .unwrap();
        (conn.table("trades").unwrap(), conn.table("quotes").unwrap())
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("Backward".parse::<AsofDirection>().unwrap(), AsofDirection::Backward);
        assert_eq!(">=".parse::<AsofDirection>().unwrap(), AsofDirection::Backward);
        assert_eq!("<=".parse::<AsofDirection>().unwrap(), AsofDirection::Forward);
        assert_eq!("nearest".parse::<AsofDirection>().unwrap(), AsofDirection::Nearest);
        let err = "sideways".parse::<AsofDirection>().unwrap_err();
        assert!(matches!(err, DuckPlusError::InvalidDirection(d) if d == "sideways"));
    }

    #[test]
    fn test_tolerance_parsing() {
        let tolerance: Tolerance = "5 minutes".parse().unwrap();
        assert_eq!(tolerance.quantity(), 5);
        assert_eq!(tolerance.unit(), IntervalUnit::Minute);
        assert_eq!(tolerance.to_string(), "5 minutes");

        let weeks: Tolerance = " 2w ".parse().unwrap();
        assert_eq!((weeks.quantity(), weeks.unit()), (14, IntervalUnit::Day));

        assert!("5".parse::<Tolerance>().is_err());
        assert!("five minutes".parse::<Tolerance>().is_err());
        assert!("1 fortnight".parse::<Tolerance>().is_err());
        assert!("5 minutes'; DROP TABLE t; --".parse::<Tolerance>().is_err());
        assert!("9999999999999 hours".parse::<Tolerance>().is_err());
    }

    #[test]
    fn test_tolerance_from_duration() {
        let whole = Tolerance::try_from(Duration::from_secs(90)).unwrap();
        assert_eq!(whole.to_string(), "90 seconds");
        let fine = Tolerance::try_from(Duration::from_millis(1500)).unwrap();
        assert_eq!(fine.to_string(), "1500000 microseconds");
    }

    #[test]
    fn test_spec_parse() {
        let spec = AsofSpec::parse("ts", &["sym"], "forward", Some("1 hour")).unwrap();
        assert_eq!(spec.on(), "ts");
        assert_eq!(spec.by(), ["sym"]);
        assert_eq!(spec.direction(), AsofDirection::Forward);
        assert_eq!(spec.tolerance().unwrap().to_string(), "1 hours");
        assert!(AsofSpec::parse::<&str>("ts", &[], "up", None).is_err());
    }

    #[test]
    fn test_ranking_query_parses_as_duckdb() {
        let (left, right) = relations();
        for direction in [AsofDirection::Backward, AsofDirection::Forward, AsofDirection::Nearest] {
            let spec = AsofSpec::new("ts")
                .with_by(&["sym"])
                .with_direction(direction)
                .with_tolerance("30 seconds".parse().unwrap());
            let sql = ranking_query(&left, &right, &spec).to_string();
            assert!(
                Parser::parse_sql(&DuckDbDialect {}, &sql).is_ok(),
                "{} query did not parse:\n{}",
                direction,
                sql
            );
        }
    }

    #[test]
    fn test_helper_columns_avoid_collisions() {
        let (left, right) = relations();
        let sql = ranking_query(&left, &right, &AsofSpec::new("ts")).to_string();
        assert!(sql.contains("AS \"__asof_row_1\""));
        assert!(sql.contains("AS \"__asof_rank\""));
    }

    #[test]
    fn test_ranking_query_uses_derived_tables_only() {
        let (left, right) = relations();
        let sql = ranking_query(&left, &right, &AsofSpec::new("ts").with_by(&["sym"])).to_string();
        assert!(!sql.starts_with("WITH"));
        assert!(sql.contains(") AS \"l\""));
        assert!(sql.contains(") AS \"m\""));
        assert!(!sql.contains("FROM \"l\""));
        assert!(!sql.contains("JOIN \"m\""));
    }

    #[test]
    fn test_tolerance_requires_temporal_column() {
        let (left, right) = relations();
        let spec = AsofSpec::new("price").with_tolerance("1 second".parse().unwrap());
        let err = plan(&left, &right, &spec).unwrap_err();
        assert!(matches!(err, DuckPlusError::MissingJoinColumn { .. }));

        let conn = left.connection();
        let l = conn.sql("SELECT 1 AS k, 10 AS v").unwrap();
        let r = conn.sql("SELECT 1 AS k, 9 AS v, 'x' AS tag").unwrap();
        let spec = AsofSpec::new("v").with_tolerance("1 second".parse().unwrap());
        assert!(matches!(
            plan(&l, &r, &spec).unwrap_err(),
            DuckPlusError::InvalidTolerance(_)
        ));
    }
}
