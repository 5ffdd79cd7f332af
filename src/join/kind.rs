use std::fmt;
use std::str::FromStr;

use crate::engine::NativeJoinKind;
use crate::error::DuckPlusError;

/// Closed set of column-driven join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Natural,
    NaturalLeft,
    NaturalSemi,
    NaturalAnti,
}

/// Execution path for a join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRoute {
    /// Explicit keys, handed to the engine's native join
    Native(NativeJoinKind),
    /// Keys inferred from the common columns
    Natural(NaturalRoute),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalRoute {
    Native(NativeJoinKind),
    /// `[NOT] EXISTS` subquery keeping only the left columns
    Existence { negated: bool },
}

impl JoinKind {
    pub const ALL: [JoinKind; 10] = [
        JoinKind::Inner,
        JoinKind::Left,
        JoinKind::Right,
        JoinKind::Full,
        JoinKind::Semi,
        JoinKind::Anti,
        JoinKind::Natural,
        JoinKind::NaturalLeft,
        JoinKind::NaturalSemi,
        JoinKind::NaturalAnti,
    ];

    pub fn is_natural(&self) -> bool {
        matches!(self.route(), JoinRoute::Natural(_))
    }

    pub fn route(&self) -> JoinRoute {
        match self {
            JoinKind::Inner => JoinRoute::Native(NativeJoinKind::Inner),
            JoinKind::Left => JoinRoute::Native(NativeJoinKind::Left),
            JoinKind::Right => JoinRoute::Native(NativeJoinKind::Right),
            JoinKind::Full => JoinRoute::Native(NativeJoinKind::Full),
            JoinKind::Semi => JoinRoute::Native(NativeJoinKind::Semi),
            JoinKind::Anti => JoinRoute::Native(NativeJoinKind::Anti),
            JoinKind::Natural => JoinRoute::Natural(NaturalRoute::Native(NativeJoinKind::Inner)),
            JoinKind::NaturalLeft => JoinRoute::Natural(NaturalRoute::Native(NativeJoinKind::Left)),
            JoinKind::NaturalSemi => JoinRoute::Natural(NaturalRoute::Existence { negated: false }),
            JoinKind::NaturalAnti => JoinRoute::Natural(NaturalRoute::Existence { negated: true }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Full => "full",
            JoinKind::Semi => "semi",
            JoinKind::Anti => "anti",
            JoinKind::Natural => "natural",
            JoinKind::NaturalLeft => "natural left",
            JoinKind::NaturalSemi => "natural semi",
            JoinKind::NaturalAnti => "natural anti",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JoinKind {
    type Err = DuckPlusError;

    /// Case-insensitive; `-`, `_` and runs of whitespace all separate words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        let kind = match normalized.as_str() {
            "inner" => JoinKind::Inner,
            "left" | "left outer" => JoinKind::Left,
            "right" | "right outer" => JoinKind::Right,
            "full" | "outer" | "full outer" => JoinKind::Full,
            "semi" => JoinKind::Semi,
            "anti" => JoinKind::Anti,
            "natural" => JoinKind::Natural,
            "natural left" => JoinKind::NaturalLeft,
            "natural semi" => JoinKind::NaturalSemi,
            "natural anti" => JoinKind::NaturalAnti,
            _ => return Err(DuckPlusError::UnsupportedJoinKind(s.to_string())),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spellings() {
        assert_eq!("INNER".parse::<JoinKind>().unwrap(), JoinKind::Inner);
        assert_eq!("outer".parse::<JoinKind>().unwrap(), JoinKind::Full);
        assert_eq!("full outer".parse::<JoinKind>().unwrap(), JoinKind::Full);
        assert_eq!("natural-left".parse::<JoinKind>().unwrap(), JoinKind::NaturalLeft);
        assert_eq!("natural_semi".parse::<JoinKind>().unwrap(), JoinKind::NaturalSemi);
        assert_eq!("Natural  Anti".parse::<JoinKind>().unwrap(), JoinKind::NaturalAnti);
    }

    #[test]
    fn test_unknown_kind() {
        let err = "cross".parse::<JoinKind>().unwrap_err();
        assert!(matches!(err, DuckPlusError::UnsupportedJoinKind(kind) if kind == "cross"));
        assert!("natural right".parse::<JoinKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in JoinKind::ALL {
            assert_eq!(kind.to_string().parse::<JoinKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_routes() {
        assert_eq!(JoinKind::Full.route(), JoinRoute::Native(NativeJoinKind::Full));
        assert_eq!(
            JoinKind::NaturalLeft.route(),
            JoinRoute::Natural(NaturalRoute::Native(NativeJoinKind::Left))
        );
        assert_eq!(
            JoinKind::NaturalAnti.route(),
            JoinRoute::Natural(NaturalRoute::Existence { negated: true })
        );
        assert!(JoinKind::NaturalSemi.is_natural());
        assert!(!JoinKind::Semi.is_natural());
    }
}
