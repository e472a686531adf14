// Football positions, draft rounds, and position normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board column positions, in display order.
///
/// A player's raw position (e.g. "CB") is collapsed into one of these buckets
/// by [`normalize_position`] before any slot comparison happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    OffensiveLine,
    DefensiveLine,
    Edge,
    Linebacker,
    DefensiveBack,
}

impl Position {
    /// Every board column, left to right.
    pub const ALL: [Position; 9] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::OffensiveLine,
        Position::DefensiveLine,
        Position::Edge,
        Position::Linebacker,
        Position::DefensiveBack,
    ];

    /// Parse a column code ("QB", "EDGE", ...) exactly as it appears in a
    /// stored board document. Case-insensitive. Sub-positions such as "CB"
    /// are not column codes; use [`normalize_position`] for player data.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "OL" => Some(Position::OffensiveLine),
            "DL" => Some(Position::DefensiveLine),
            "EDGE" => Some(Position::Edge),
            "LB" => Some(Position::Linebacker),
            "DB" => Some(Position::DefensiveBack),
            _ => None,
        }
    }

    /// Return the column code for this position.
    pub fn code(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::OffensiveLine => "OL",
            Position::DefensiveLine => "DL",
            Position::Edge => "EDGE",
            Position::Linebacker => "LB",
            Position::DefensiveBack => "DB",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Map a raw player position onto its board column.
///
/// This is the only place position families are defined: cornerbacks and
/// safeties slot under DB. Returns `None` for positions with no column
/// (kickers, long snappers, blanks), which keeps such players off the board.
pub fn normalize_position(raw: &str) -> Option<Position> {
    match raw.trim().to_uppercase().as_str() {
        "CB" | "S" => Some(Position::DefensiveBack),
        other => Position::from_code(other),
    }
}

/// Draft rounds that make up the board rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Round {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Undrafted,
}

impl Round {
    pub const ALL: [Round; 8] = [
        Round::First,
        Round::Second,
        Round::Third,
        Round::Fourth,
        Round::Fifth,
        Round::Sixth,
        Round::Seventh,
        Round::Undrafted,
    ];

    /// Label used both on screen and as the round key in board documents.
    pub fn label(&self) -> &'static str {
        match self {
            Round::First => "ROUND 1",
            Round::Second => "ROUND 2",
            Round::Third => "ROUND 3",
            Round::Fourth => "ROUND 4",
            Round::Fifth => "ROUND 5",
            Round::Sixth => "ROUND 6",
            Round::Seventh => "ROUND 7",
            Round::Undrafted => "UDFA",
        }
    }

    /// Parse a round label. Accepts the stored form ("ROUND 3") regardless of
    /// case and surrounding whitespace.
    pub fn from_label(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Round::ALL.into_iter().find(|r| r.label() == upper)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
