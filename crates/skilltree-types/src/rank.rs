//! Rank scales.
//!
//! `Rank` is the canonical fine-grained scale (11 values with +/- modifiers).
//! `CoarseRank` is its modifier-free 7-value projection, and `DisplayTier`
//! is the aggregate-statistics view that folds the lowest ranks together.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fine-grained ordinal rank. Declaration order is the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    F,
    E,
    D,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    A,
    S,
}

impl Rank {
    pub const ALL: [Rank; 11] = [
        Rank::F,
        Rank::E,
        Rank::D,
        Rank::CMinus,
        Rank::C,
        Rank::CPlus,
        Rank::BMinus,
        Rank::B,
        Rank::BPlus,
        Rank::A,
        Rank::S,
    ];

    /// Position on the fine scale, 0 (F) through 10 (S).
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Drop the +/- modifier.
    pub fn coarse(self) -> CoarseRank {
        match self {
            Rank::F => CoarseRank::F,
            Rank::E => CoarseRank::E,
            Rank::D => CoarseRank::D,
            Rank::CMinus | Rank::C | Rank::CPlus => CoarseRank::C,
            Rank::BMinus | Rank::B | Rank::BPlus => CoarseRank::B,
            Rank::A => CoarseRank::A,
            Rank::S => CoarseRank::S,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::F => "F",
            Rank::E => "E",
            Rank::D => "D",
            Rank::CMinus => "C-",
            Rank::C => "C",
            Rank::CPlus => "C+",
            Rank::BMinus => "B-",
            Rank::B => "B",
            Rank::BPlus => "B+",
            Rank::A => "A",
            Rank::S => "S",
        };
        f.write_str(s)
    }
}

impl FromStr for Rank {
    type Err = String;

    /// Parse a label such as `"B+"`, `"c-"` or `"S"`. Whitespace around the
    /// letter and modifier is ignored; U+2212 is accepted as a minus sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == '\u{2212}' { '-' } else { c })
            .collect::<String>()
            .to_uppercase();

        match compact.as_str() {
            "F" => Ok(Rank::F),
            "E" => Ok(Rank::E),
            "D" => Ok(Rank::D),
            "C-" => Ok(Rank::CMinus),
            "C" => Ok(Rank::C),
            "C+" => Ok(Rank::CPlus),
            "B-" => Ok(Rank::BMinus),
            "B" => Ok(Rank::B),
            "B+" => Ok(Rank::BPlus),
            "A" => Ok(Rank::A),
            "S" => Ok(Rank::S),
            _ => Err(format!("invalid rank label: '{s}'")),
        }
    }
}

/// Modifier-free projection of [`Rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoarseRank {
    F,
    E,
    D,
    C,
    B,
    A,
    S,
}

impl fmt::Display for CoarseRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoarseRank::F => "F",
            CoarseRank::E => "E",
            CoarseRank::D => "D",
            CoarseRank::C => "C",
            CoarseRank::B => "B",
            CoarseRank::A => "A",
            CoarseRank::S => "S",
        };
        f.write_str(s)
    }
}

/// Display bucket for aggregate statistics. Never used for ordering nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "tier", content = "rank", rename_all = "snake_case")]
pub enum DisplayTier {
    Beginner,
    Ranked(CoarseRank),
}

impl fmt::Display for DisplayTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayTier::Beginner => write!(f, "beginner"),
            DisplayTier::Ranked(r) => write!(f, "{r}"),
        }
    }
}

/// How a rank label was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSource {
    Override,
    Tier,
}

/// Resolved rank of a node: the ordinal plus the label text to display.
///
/// For overrides `text` is the authored label verbatim (trimmed); for
/// tier-derived ranks it is the canonical rendering of `rank`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankLabel {
    pub rank: Rank,
    pub text: String,
    pub source: RankSource,
}
