//! Join Composition
//!
//! Column-driven joins (`using_join`) and temporal as-of joins (`asof_join`) on
//! top of DuckDB relations. Every request is validated before anything reaches
//! the engine, then routed either to the native `JOIN ... USING` primitive or to
//! a synthesized query:
//! - explicit keys (inner, left, right, full, semi, anti) → native primitive,
//!   re-projected when the engine's column layout differs
//! - natural, natural left → inferred keys, native primitive
//! - natural semi, natural anti → `[NOT] EXISTS` query
//! - as-of → ranking query
//!
//! Output columns are the left columns in order, followed by the right columns
//! whose name (case-insensitively) is not already on the left. Semi and anti
//! joins return the left columns only.

pub mod asof;
pub mod columns;
pub mod kind;
pub mod native;
pub mod synthesize;
pub mod validate;

pub use asof::{AsofDirection, AsofSpec, IntervalUnit, Tolerance};
pub use columns::{natural_keys, output_projection, ColumnSet, Projection};
pub use kind::{JoinKind, JoinRoute, NaturalRoute};
pub use validate::JoinKeyValidator;

use tracing::debug;

use crate::engine::Relation;
use crate::error::{DuckPlusError, Result};
use crate::joinable::Joinable;

/// Join kind plus the explicit key list (empty for natural kinds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    kind: JoinKind,
    keys: Vec<String>,
}

impl JoinSpec {
    pub fn new<S: AsRef<str>>(kind: JoinKind, keys: &[S]) -> Self {
        Self {
            kind,
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }

    pub fn natural(kind: JoinKind) -> Self {
        Self {
            kind,
            keys: Vec::new(),
        }
    }

    /// Parse the join kind from its name, e.g. `"natural-left"` or `"full outer"`.
    pub fn parse<S: AsRef<str>>(how: &str, keys: &[S]) -> Result<Self> {
        Ok(Self::new(how.parse()?, keys))
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Validate `spec` against both inputs and run it.
pub fn compose(left: &Relation, right: &Relation, spec: &JoinSpec) -> Result<Relation> {
    if !left.connection().same_as(right.connection()) {
        return Err(DuckPlusError::ConnectionMismatch);
    }

    let validator = JoinKeyValidator::for_relations(left, right);
    match spec.kind.route() {
        JoinRoute::Native(kind) => {
            validator.check_join_keys(spec.kind, &spec.keys)?;
            native::dispatch(left, right, &spec.keys, kind)
        }
        JoinRoute::Natural(route) => {
            if !spec.keys.is_empty() {
                return Err(DuckPlusError::ExplicitKeysNotAllowedForNaturalJoin);
            }
            let keys = natural_keys(left.columns(), right.columns())?;
            validator.check_columns(&keys)?;
            debug!("Natural {} join resolved keys: {:?}", spec.kind, keys);
            match route {
                NaturalRoute::Native(kind) => native::dispatch(left, right, &keys, kind),
                NaturalRoute::Existence { negated } => {
                    synthesize::existence_join(left, right, &keys, negated)
                }
            }
        }
    }
}

/// Join operators available on every [`Joinable`].
pub trait RelationJoins: Joinable {
    /// Join on `using_columns` with the kind named by `how`.
    ///
    /// Natural kinds take no columns; their keys are the columns both inputs share.
    /// Inputs from different connections are rejected before `how` is parsed.
    fn using_join<S: AsRef<str>>(
        &self,
        other: &dyn Joinable,
        how: &str,
        using_columns: &[S],
    ) -> Result<Relation> {
        if !self.is_joinable_with(other) {
            return Err(DuckPlusError::ConnectionMismatch);
        }
        let spec = JoinSpec::parse(how, using_columns)?;
        self.join_with(other, &spec)
    }

    fn join_with(&self, other: &dyn Joinable, spec: &JoinSpec) -> Result<Relation> {
        if !self.is_joinable_with(other) {
            return Err(DuckPlusError::ConnectionMismatch);
        }
        compose(self.relation(), other.relation(), spec)
    }

    /// Match each row to the closest row of `other` by `on`; see [`AsofSpec`].
    fn asof_join(&self, other: &dyn Joinable, spec: &AsofSpec) -> Result<Relation> {
        if !self.is_joinable_with(other) {
            return Err(DuckPlusError::ConnectionMismatch);
        }
        asof::plan(self.relation(), other.relation(), spec)
    }
}

impl<T: Joinable + ?Sized> RelationJoins for T {}
