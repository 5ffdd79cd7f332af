use std::fmt;

use itertools::Itertools;
use polars::prelude::{DataFrame, IntoLazy, LazyFrame};
use tracing::trace;

use super::connection::Connection;
use super::{frame, quote_identifier, Value};
use crate::error::{DuckPlusError, Result};

/// Name and engine type of one relation column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// DuckDB type name as reported by `DESCRIBE` (e.g. "INTEGER", "TIMESTAMP")
    pub data_type: String,
}

impl Field {
    pub fn is_temporal(&self) -> bool {
        let ty = self.data_type.to_uppercase();
        ty == "DATE" || ty.starts_with("TIMESTAMP") || ty.starts_with("TIME")
    }
}

/// Join kinds the engine's `JOIN ... USING` primitive executes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeJoinKind {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl NativeJoinKind {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            NativeJoinKind::Inner => "INNER JOIN",
            NativeJoinKind::Left => "LEFT OUTER JOIN",
            NativeJoinKind::Right => "RIGHT OUTER JOIN",
            NativeJoinKind::Full => "FULL OUTER JOIN",
            NativeJoinKind::Semi => "SEMI JOIN",
            NativeJoinKind::Anti => "ANTI JOIN",
        }
    }

    /// Semi and anti joins only filter the left input.
    pub fn keeps_right_columns(&self) -> bool {
        !matches!(self, NativeJoinKind::Semi | NativeJoinKind::Anti)
    }
}

impl fmt::Display for NativeJoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeJoinKind::Inner => "inner",
            NativeJoinKind::Left => "left",
            NativeJoinKind::Right => "right",
            NativeJoinKind::Full => "full",
            NativeJoinKind::Semi => "semi",
            NativeJoinKind::Anti => "anti",
        };
        write!(f, "{}", name)
    }
}

/// Immutable, lazily evaluated relation bound to the connection that produced it.
///
/// A relation is a query plan (SQL text) plus the columns the engine reported
/// for it. Composing relations never executes anything; rows are only produced
/// by [`Relation::fetch_all`], [`Relation::row_count`] and the DataFrame helpers.
#[derive(Clone)]
pub struct Relation {
    conn: Connection,
    plan: String,
    fields: Vec<Field>,
    columns: Vec<String>,
}

impl Relation {
    pub(crate) fn new(conn: Connection, plan: String, fields: Vec<Field>) -> Self {
        let columns = fields.iter().map(|f| f.name.clone()).collect();
        Self {
            conn,
            plan,
            fields,
            columns,
        }
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&Field> {
        let folded = name.to_lowercase();
        self.fields.iter().find(|f| f.name.to_lowercase() == folded)
    }

    /// Query text this relation evaluates.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The engine's native join: `SELECT * FROM l <kind> JOIN r USING (keys)`.
    ///
    /// Output columns are whatever the engine produces for a star projection over
    /// a USING join; callers that need a specific column layout re-project.
    pub fn native_join(
        &self,
        other: &Relation,
        keys: &[String],
        kind: NativeJoinKind,
    ) -> Result<Relation> {
        if !self.conn.same_as(&other.conn) {
            return Err(DuckPlusError::ConnectionMismatch);
        }
        let sql = format!(
            "SELECT * FROM ({}) AS {} {} ({}) AS {} USING ({})",
            self.plan,
            quote_identifier("l"),
            kind.sql_keyword(),
            other.plan,
            quote_identifier("r"),
            keys.iter().map(|k| quote_identifier(k)).join(", ")
        );
        trace!("Native join plan: {}", sql);
        self.conn.sql(&sql)
    }

    /// Execute the plan and return every row.
    pub fn fetch_all(&self) -> Result<Vec<Vec<Value>>> {
        let width = self.columns.len();
        self.conn.with_connection(|conn| {
            let mut stmt = conn.prepare(&self.plan)?;
            let rows = stmt
                .query_map([], |row| {
                    (0..width)
                        .map(|idx| row.get::<_, Value>(idx))
                        .collect::<duckdb::Result<Vec<_>>>()
                })?
                .collect::<duckdb::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn row_count(&self) -> Result<usize> {
        let sql = format!(
            "SELECT count(*) FROM ({}) AS {}",
            self.plan,
            quote_identifier("counted")
        );
        let count = self
            .conn
            .with_connection(|conn| Ok(conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?))?;
        usize::try_from(count)
            .map_err(|_| DuckPlusError::Engine(format!("negative row count: {}", count)))
    }

    /// Execute the plan and collect the result into a polars DataFrame.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = self.fetch_all()?;
        frame::rows_to_dataframe(&self.columns, &rows)
    }

    /// Collected result as a LazyFrame, for further polars processing.
    pub fn to_lazy(&self) -> Result<LazyFrame> {
        Ok(self.to_dataframe()?.lazy())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Relation(source={}, columns=[{}])",
            self.conn.path(),
            self.columns.iter().map(|c| format!("'{}'", c)).join(", ")
        )
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("source", &self.conn.path())
            .field("columns", &self.columns)
            .field("plan", &self.plan)
            .finish()
    }
}
