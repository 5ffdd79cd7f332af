//! DuckDB Engine Adapter
//!
//! DuckDB is the canonical correctness engine. This module is the only place that
//! talks to it, and it exposes exactly what the join layer consumes:
//! - ordered column names of a relation
//! - the native `JOIN ... USING` primitive
//! - execution of query text on a connection
//! - identifier quoting that follows DuckDB's grammar
//!
//! Everything else (fetching rows, materializing a polars DataFrame) exists for
//! callers that want to look at a result.

mod connection;
mod frame;
mod relation;

pub use connection::Connection;
pub use duckdb::types::Value;
pub use relation::{Field, NativeJoinKind, Relation};

/// Quote an identifier (column name, table name, alias) for DuckDB.
///
/// Identifiers are always delimited with double quotes; an embedded double quote
/// is escaped by doubling it, so no name can terminate the identifier early.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
