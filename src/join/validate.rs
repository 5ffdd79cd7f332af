use std::collections::HashSet;

use super::columns::{fold, ColumnSet};
use super::kind::JoinKind;
use crate::engine::Relation;
use crate::error::{DuckPlusError, Result};

/// Checks requested join columns against both inputs before anything executes.
#[derive(Debug, Clone)]
pub struct JoinKeyValidator {
    left: ColumnSet,
    right: ColumnSet,
}

impl JoinKeyValidator {
    pub fn new<L: AsRef<str>, R: AsRef<str>>(left: &[L], right: &[R]) -> Self {
        Self {
            left: ColumnSet::new(left),
            right: ColumnSet::new(right),
        }
    }

    pub fn for_relations(left: &Relation, right: &Relation) -> Self {
        Self::new(left.columns(), right.columns())
    }

    /// Key list of a `using_join`. Empty lists are only accepted for natural
    /// kinds, whose keys are resolved later and checked with [`Self::check_columns`].
    pub fn check_join_keys<S: AsRef<str>>(&self, kind: JoinKind, keys: &[S]) -> Result<()> {
        if keys.is_empty() {
            if kind.is_natural() {
                return Ok(());
            }
            return Err(DuckPlusError::EmptyJoinKeys(kind.to_string()));
        }
        self.check_columns(keys)
    }

    /// No case-insensitive duplicates, and every column present on both sides.
    pub fn check_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        let mut seen = HashSet::new();
        for column in columns {
            if !seen.insert(fold(column.as_ref())) {
                return Err(DuckPlusError::DuplicateJoinKey(column.as_ref().to_string()));
            }
        }

        let missing_in = |set: &ColumnSet| -> Vec<String> {
            columns
                .iter()
                .map(|c| c.as_ref())
                .filter(|c| !set.contains(c))
                .map(str::to_string)
                .collect()
        };
        let left = missing_in(&self.left);
        let right = missing_in(&self.right);
        if !left.is_empty() || !right.is_empty() {
            return Err(DuckPlusError::MissingJoinColumn { left, right });
        }
        Ok(())
    }
}
