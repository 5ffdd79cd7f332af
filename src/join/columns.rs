//! Column Resolution
//!
//! Column names are matched case-insensitively (DuckDB identifiers are), while
//! the original casing is kept for display and quoting. Two names that differ
//! only in case are the same join key.

use std::collections::HashSet;

use crate::error::{DuckPlusError, Result};

/// Case-folded form used for every column comparison.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Case-folded view of a column list. Matching only; never renames anything.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    folded: HashSet<String>,
}

impl ColumnSet {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            folded: columns.iter().map(|c| fold(c.as_ref())).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.folded.contains(&fold(name))
    }

    pub fn len(&self) -> usize {
        self.folded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }
}

/// Natural join keys: left columns whose name also appears on the right, in
/// left order, each case-folded name at most once.
pub fn natural_keys(left: &[String], right: &[String]) -> Result<Vec<String>> {
    let right_set = ColumnSet::new(right);
    let mut seen = HashSet::new();
    let keys: Vec<String> = left
        .iter()
        .filter(|column| right_set.contains(column) && seen.insert(fold(column)))
        .cloned()
        .collect();

    if keys.is_empty() {
        return Err(DuckPlusError::NoCommonColumns);
    }
    Ok(keys)
}

/// Output column layout of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Every left column, in order
    pub left: Vec<String>,
    /// Right columns whose name does not appear on the left, in order
    pub right: Vec<String>,
}

impl Projection {
    pub fn names(&self) -> Vec<String> {
        self.left.iter().chain(self.right.iter()).cloned().collect()
    }
}

pub fn output_projection(left: &[String], right: &[String]) -> Projection {
    let left_set = ColumnSet::new(left);
    Projection {
        left: left.to_vec(),
        right: right
            .iter()
            .filter(|column| !left_set.contains(column))
            .cloned()
            .collect(),
    }
}

/// First of `base`, `base_1`, `base_2`, ... that none of `sets` contains.
pub fn unused_name(base: &str, sets: &[&ColumnSet]) -> String {
    let taken = |name: &str| sets.iter().any(|set| set.contains(name));
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
