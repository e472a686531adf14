// Slot keys and the container ids used by drag-and-drop gestures.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::position::{Position, Round};

/// Prefix of bank column ids ("bank::QB").
pub const BANK_PREFIX: &str = "bank";
/// Separator between the two halves of a container id.
pub const ID_SEPARATOR: &str = "::";

/// Identifies one board slot: a round row crossed with a position column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub round: Round,
    pub position: Position,
}

impl SlotKey {
    pub fn new(round: Round, position: Position) -> Self {
        SlotKey { round, position }
    }

    /// Every slot on the board, row by row.
    pub fn all() -> impl Iterator<Item = SlotKey> {
        Round::ALL
            .into_iter()
            .flat_map(|round| Position::ALL.into_iter().map(move |pos| SlotKey::new(round, pos)))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ID_SEPARATOR}{}", self.round.label(), self.position.code())
    }
}

/// Where a player currently sits: a board slot or its bank column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerRef {
    Slot(SlotKey),
    Bank(Position),
}

impl ContainerRef {
    /// Parse a container id: `"ROUND 2::WR"` or `"bank::DB"`.
    pub fn parse(id: &str) -> Option<Self> {
        let (head, tail) = id.split_once(ID_SEPARATOR)?;
        let position = Position::from_code(tail)?;
        if head.trim().eq_ignore_ascii_case(BANK_PREFIX) {
            return Some(ContainerRef::Bank(position));
        }
        let round = Round::from_label(head)?;
        Some(ContainerRef::Slot(SlotKey::new(round, position)))
    }

}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerRef::Slot(key) => write!(f, "{key}"),
            ContainerRef::Bank(pos) => write!(f, "{BANK_PREFIX}{ID_SEPARATOR}{}", pos.code()),
        }
    }
}

impl From<SlotKey> for ContainerRef {
    fn from(key: SlotKey) -> Self {
        ContainerRef::Slot(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn there_are_seventy_two_slots() {
        assert_eq!(SlotKey::all().count(), Round::ALL.len() * Position::ALL.len());
        let first = SlotKey::all().next().unwrap();
        assert_eq!(first, SlotKey::new(Round::First, Position::Quarterback));
    }

    #[test]
    fn parse_slot_and_bank_ids() {
        assert_eq!(
            ContainerRef::parse("ROUND 2::WR"),
            Some(ContainerRef::Slot(SlotKey::new(Round::Second, Position::WideReceiver)))
        );
        assert_eq!(
            ContainerRef::parse("UDFA::EDGE"),
            Some(ContainerRef::Slot(SlotKey::new(Round::Undrafted, Position::Edge)))
        );
        assert_eq!(
            ContainerRef::parse("bank::DB"),
            Some(ContainerRef::Bank(Position::DefensiveBack))
        );
    }

    #[test]
    fn parse_rejects_player_ids_and_garbage() {
        assert_eq!(ContainerRef::parse("abc123"), None);
        assert_eq!(ContainerRef::parse("bank::CB"), None);
        assert_eq!(ContainerRef::parse("ROUND 9::QB"), None);
        assert_eq!(ContainerRef::parse("::"), None);
    }

    #[test]
    fn display_matches_parse() {
        let slot = ContainerRef::Slot(SlotKey::new(Round::Seventh, Position::Linebacker));
        assert_eq!(slot.to_string(), "ROUND 7::LB");
        assert_eq!(ContainerRef::parse(&slot.to_string()), Some(slot));

        let bank = ContainerRef::Bank(Position::TightEnd);
        assert_eq!(bank.to_string(), "bank::TE");
        assert_eq!(ContainerRef::parse(&bank.to_string()), Some(bank));
    }
}
