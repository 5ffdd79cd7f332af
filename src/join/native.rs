use tracing::debug;

use super::columns::output_projection;
use super::synthesize;
use crate::engine::{NativeJoinKind, Relation};
use crate::error::Result;

/// Run a key-validated join through the engine's `JOIN ... USING` primitive.
///
/// The primitive's star projection is engine-defined, so its columns are compared
/// against the expected layout (left columns, then non-colliding right columns;
/// left columns only for semi and anti). Any difference falls back to the
/// re-projected query. Right and full joins always take the fallback since the
/// surviving key column must come from whichever side matched.
pub fn dispatch(
    left: &Relation,
    right: &Relation,
    keys: &[String],
    kind: NativeJoinKind,
) -> Result<Relation> {
    if matches!(kind, NativeJoinKind::Right | NativeJoinKind::Full) {
        debug!("Re-projected {} join on keys: {:?}", kind, keys);
        return synthesize::reprojected_join(left, right, keys, kind);
    }

    let expected = if kind.keeps_right_columns() {
        output_projection(left.columns(), right.columns()).names()
    } else {
        left.columns().to_vec()
    };

    let joined = left.native_join(right, keys, kind)?;
    if joined.columns() == expected.as_slice() {
        debug!("Native {} join on keys: {:?}", kind, keys);
        return Ok(joined);
    }

    debug!(
        "Native {} join produced {:?}, re-projecting to {:?}",
        kind,
        joined.columns(),
        expected
    );
    synthesize::reprojected_join(left, right, keys, kind)
}
