//! Typed Query Tree
//!
//! Synthesized joins are built as a small tree (select list, source, nested
//! selects, joins, predicate, ordering) and rendered to DuckDB SQL exactly once.
//! Every identifier goes through [`quote_identifier`](crate::engine::quote_identifier);
//! the only literals the tree can hold are integers, `TRUE` and interval
//! literals built from a validated tolerance.

mod ast;
mod render;

pub use ast::{
    BinaryOperator, Expr, Join, JoinConstraint, JoinOperator, Literal, OrderBy,
    Query, Select, SelectItem, TableRef,
};
