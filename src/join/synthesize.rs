//! Query Synthesis
//!
//! Builds the query text for joins the native primitive cannot express. Inputs
//! are always referenced through the aliases below, never through caller
//! identifiers, and every identifier goes through [`quote_identifier`].
//!
//! [`quote_identifier`]: crate::engine::quote_identifier

use tracing::{debug, trace};

use super::columns::{output_projection, ColumnSet};
use crate::engine::{NativeJoinKind, Relation};
use crate::error::Result;
use crate::sql::{Expr, Join, JoinConstraint, JoinOperator, Query, Select, SelectItem, TableRef};

/// Alias of the left input.
pub const LEFT: &str = "l";
/// Alias of the right input.
pub const RIGHT: &str = "r";
/// Alias of the as-of match set.
pub const MATCHES: &str = "m";

/// Render `query` once and bind it on the left input's connection.
pub fn execute(left: &Relation, query: &Query) -> Result<Relation> {
    let sql = query.to_string();
    trace!("Synthesized query:\n{}", sql);
    left.connection().sql(&sql)
}

pub(crate) fn derived(relation: &Relation, alias: &str) -> TableRef {
    TableRef::Derived {
        plan: relation.plan().to_string(),
        alias: alias.to_string(),
    }
}

/// `l.k1 = r.k1 AND l.k2 = r.k2 ...`
pub(crate) fn key_equalities(keys: &[String]) -> Expr {
    Expr::and(
        keys.iter()
            .map(|key| Expr::eq(Expr::column(LEFT, key), Expr::column(RIGHT, key))),
    )
}

/// Left columns under their own names.
fn left_items(left: &Relation) -> Vec<SelectItem> {
    left.columns()
        .iter()
        .map(|column| SelectItem::aliased(Expr::column(LEFT, column), column.as_str()))
        .collect()
}

/// `SELECT l.* FROM l WHERE [NOT] EXISTS (SELECT 1 FROM r WHERE l.k = r.k ...)`
pub fn existence_join(
    left: &Relation,
    right: &Relation,
    keys: &[String],
    negated: bool,
) -> Result<Relation> {
    debug!("Existence join (negated={}) on keys: {:?}", negated, keys);
    let subquery = Select::new(derived(right, RIGHT))
        .project([SelectItem::unnamed(Expr::integer(1))])
        .filter(key_equalities(keys));

    let body = Select::new(derived(left, LEFT))
        .project(left_items(left))
        .filter(Expr::exists(subquery, negated));

    execute(left, &Query::new(body))
}

/// The same join the native primitive runs, with an explicit select list that
/// produces exactly the left columns followed by the non-colliding right columns.
///
/// Key columns of right and full joins are coalesced so rows that only exist
/// on the right still carry their key.
pub fn reprojected_join(
    left: &Relation,
    right: &Relation,
    keys: &[String],
    kind: NativeJoinKind,
) -> Result<Relation> {
    let operator = match kind {
        NativeJoinKind::Inner => JoinOperator::Inner,
        NativeJoinKind::Left => JoinOperator::LeftOuter,
        NativeJoinKind::Right => JoinOperator::RightOuter,
        NativeJoinKind::Full => JoinOperator::FullOuter,
        NativeJoinKind::Semi => JoinOperator::Semi,
        NativeJoinKind::Anti => JoinOperator::Anti,
    };
    let coalesce_keys = matches!(kind, NativeJoinKind::Right | NativeJoinKind::Full);
    let key_set = ColumnSet::new(keys);

    let mut items: Vec<SelectItem> = left
        .columns()
        .iter()
        .map(|column| {
            let expr = if coalesce_keys && key_set.contains(column) {
                Expr::Coalesce(vec![Expr::column(LEFT, column), Expr::column(RIGHT, column)])
            } else {
                Expr::column(LEFT, column)
            };
            SelectItem::aliased(expr, column.as_str())
        })
        .collect();

    if kind.keeps_right_columns() {
        let projection = output_projection(left.columns(), right.columns());
        items.extend(
            projection
                .right
                .iter()
                .map(|column| SelectItem::aliased(Expr::column(RIGHT, column), column.as_str())),
        );
    }

    let body = Select::new(derived(left, LEFT))
        .project(items)
        .join(Join {
            operator,
            table: derived(right, RIGHT),
            constraint: JoinConstraint::On(key_equalities(keys)),
        });

    execute(left, &Query::new(body))
}
