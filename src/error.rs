use std::fmt;

use itertools::Itertools;
use thiserror::Error;

/// Which input of a join a column lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DuckPlusError {
    #[error("Columns missing in join: {}", describe_missing(.left, .right))]
    MissingJoinColumn {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("Duplicate join column: {0}")]
    DuplicateJoinKey(String),

    #[error("No common columns for natural join")]
    NoCommonColumns,

    #[error("Do not specify join columns for natural joins")]
    ExplicitKeysNotAllowedForNaturalJoin,

    #[error("Join columns must be specified and non-empty for a {0} join")]
    EmptyJoinKeys(String),

    #[error("Unsupported join kind: {0}")]
    UnsupportedJoinKind(String),

    #[error("Invalid as-of direction: {0}. Must be 'backward', 'forward', or 'nearest'")]
    InvalidDirection(String),

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),

    #[error("Relations belong to different connections and cannot be joined")]
    ConnectionMismatch,

    #[error("Invalid connection path: {0}")]
    InvalidConnectionPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl DuckPlusError {
    /// Columns reported missing on `side`, empty for every other error.
    pub fn missing_on(&self, side: Side) -> &[String] {
        match (self, side) {
            (DuckPlusError::MissingJoinColumn { left, .. }, Side::Left) => left,
            (DuckPlusError::MissingJoinColumn { right, .. }, Side::Right) => right,
            _ => &[],
        }
    }

    /// Sides with at least one missing column.
    pub fn missing_sides(&self) -> Vec<Side> {
        [Side::Left, Side::Right]
            .into_iter()
            .filter(|side| !self.missing_on(*side).is_empty())
            .collect()
    }

    /// True for errors caused by the join request itself rather than the engine.
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            DuckPlusError::DuckDb(_) | DuckPlusError::Polars(_) | DuckPlusError::Engine(_)
        )
    }
}

fn describe_missing(left: &[String], right: &[String]) -> String {
    let mut parts = Vec::new();
    if !left.is_empty() {
        parts.push(format!("left: [{}]", left.iter().join(", ")));
    }
    if !right.is_empty() {
        parts.push(format!("right: [{}]", right.iter().join(", ")));
    }
    parts.join(", ")
}

pub type Result<T> = std::result::Result<T, DuckPlusError>;
