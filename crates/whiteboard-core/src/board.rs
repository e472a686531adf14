// Board model: a round-by-position grid of ordered player rankings.
//
// A board always holds every (round, position) slot. Players not in any slot
// make up the bank, which is derived from the catalog on demand rather than
// stored. All mutation goes through `move_item`, which enforces the
// single-placement and position-lock invariants.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::container::{ContainerRef, SlotKey};
use crate::player::{Player, PlayerId};
use crate::position::Position;

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// A single drag-and-drop resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub item: PlayerId,
    /// Container the gesture started in. Advisory: the board's own record of
    /// where the item sits takes precedence.
    pub from: ContainerRef,
    pub to: ContainerRef,
    /// Index in the destination slot to insert before. `None`, or an index
    /// past the end, appends.
    pub target_index: Option<usize>,
}

/// Why a move left the board untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The item's normalized position differs from the slot's column.
    PositionMismatch,
    /// The item is not part of the active catalog.
    UnknownItem,
    /// The session is not loaded, or is saving.
    NotReady,
    /// No signed-in owner.
    ReadOnly,
}

/// What a move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Inserted into `slot` at `index`, from the bank or another slot.
    Placed { slot: SlotKey, index: usize },
    /// Moved within `slot`.
    Reordered { slot: SlotKey, from: usize, to: usize },
    /// Removed from `from` back into the bank.
    Unplaced { from: SlotKey },
    /// Valid gesture with nothing to change (e.g. bank to bank).
    Unchanged,
    /// Invalid placement; the item snaps back.
    Rejected(RejectReason),
}

impl MoveOutcome {
    /// Whether the board now differs from before the move.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Placed { .. } | MoveOutcome::Reordered { .. } | MoveOutcome::Unplaced { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// An invariant breach found by [`Board::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DuplicatePlacement { item: PlayerId, slots: Vec<SlotKey> },
    PositionMismatch { item: PlayerId, slot: SlotKey },
    UnknownItem { item: PlayerId, slot: SlotKey },
}

/// Structural repairs made while building a board from stored slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repairs {
    pub missing_slots: usize,
    pub duplicates_dropped: Vec<PlayerId>,
}

impl Repairs {
    pub fn is_empty(&self) -> bool {
        self.missing_slots == 0 && self.duplicates_dropped.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Bank view
// ---------------------------------------------------------------------------

/// Unplaced players grouped by board column, each column sorted by surname.
#[derive(Debug, Clone)]
pub struct BankView<'a> {
    columns: BTreeMap<Position, Vec<&'a Player>>,
}

impl<'a> BankView<'a> {
    pub fn column(&self, position: Position) -> &[&'a Player] {
        self.columns.get(&position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Columns in board order, including empty ones.
    pub fn columns(&self) -> impl Iterator<Item = (Position, &[&'a Player])> + '_ {
        Position::ALL.into_iter().map(move |pos| (pos, self.column(pos)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.columns.values().flatten().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The full ranking grid for one owner and draft class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    slots: BTreeMap<SlotKey, Vec<PlayerId>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    /// A board with every slot present and empty.
    pub fn empty() -> Self {
        Board {
            slots: SlotKey::all().map(|key| (key, Vec::new())).collect(),
        }
    }

    /// Build a board from possibly incomplete stored slots.
    ///
    /// Missing slots are added empty. A player listed in more than one slot
    /// keeps its first occurrence in board order; later ones are dropped.
    pub fn from_slots(stored: BTreeMap<SlotKey, Vec<PlayerId>>) -> (Self, Repairs) {
        let mut repairs = Repairs::default();
        let mut seen: HashSet<PlayerId> = HashSet::new();
        let mut board = Board::empty();

        for key in SlotKey::all() {
            let Some(ids) = stored.get(&key) else {
                repairs.missing_slots += 1;
                continue;
            };
            let slot = board.slots.entry(key).or_default();
            for id in ids {
                if seen.insert(id.clone()) {
                    slot.push(id.clone());
                } else {
                    repairs.duplicates_dropped.push(id.clone());
                }
            }
        }

        (board, repairs)
    }

    /// Ordered player ids in a slot.
    pub fn slot(&self, key: SlotKey) -> &[PlayerId] {
        self.slots.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All slots in board order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotKey, &[PlayerId])> + '_ {
        self.slots.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Players of a slot that still exist in the catalog, in ranking order.
    /// Stale ids are skipped silently.
    pub fn resolved_slot<'a>(&self, key: SlotKey, catalog: &'a Catalog) -> Vec<&'a Player> {
        self.slot(key)
            .iter()
            .filter_map(|id| catalog.get(id))
            .collect()
    }

    /// Every placed id, across all slots.
    pub fn assigned_ids(&self) -> HashSet<&str> {
        self.slots.values().flatten().map(String::as_str).collect()
    }

    pub fn placed_count(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Slot holding `item`, with its index.
    pub fn find_slot(&self, item: &str) -> Option<(SlotKey, usize)> {
        self.slots.iter().find_map(|(key, ids)| {
            ids.iter().position(|id| id == item).map(|idx| (*key, idx))
        })
    }

    /// Current container of a catalog player: its slot, or its bank column.
    ///
    /// Returns `None` for ids outside the catalog, and for unplaced players
    /// whose position has no column.
    pub fn locate_container(&self, item: &str, catalog: &Catalog) -> Option<ContainerRef> {
        if !catalog.contains(item) {
            return None;
        }
        match self.find_slot(item) {
            Some((key, _)) => Some(ContainerRef::Slot(key)),
            None => catalog.position_of(item).map(ContainerRef::Bank),
        }
    }

    /// Players in the catalog that are not on the board.
    pub fn bank<'a>(&self, catalog: &'a Catalog) -> BankView<'a> {
        let assigned = self.assigned_ids();
        let mut columns: BTreeMap<Position, Vec<&'a Player>> =
            Position::ALL.into_iter().map(|p| (p, Vec::new())).collect();

        for player in catalog.players() {
            if assigned.contains(player.id.as_str()) {
                continue;
            }
            if let Some(pos) = player.normalized_position() {
                columns.entry(pos).or_default().push(player);
            }
        }

        for column in columns.values_mut() {
            column.sort_by(|a, b| {
                a.surname()
                    .to_lowercase()
                    .cmp(&b.surname().to_lowercase())
                    .then_with(|| a.first.to_lowercase().cmp(&b.first.to_lowercase()))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        BankView { columns }
    }

    /// Pure form of [`Board::move_item`]: returns the next board and leaves
    /// `self` untouched.
    pub fn apply(&self, cmd: &MoveCommand, catalog: &Catalog) -> (Board, MoveOutcome) {
        let mut next = self.clone();
        let outcome = next.move_item(cmd, catalog);
        (next, outcome)
    }

    /// Apply one drag-and-drop move in place.
    ///
    /// Invalid placements are rejected without touching the board. The
    /// item's source is taken from the board itself, so a stale `from` can
    /// never leave a player in two slots.
    pub fn move_item(&mut self, cmd: &MoveCommand, catalog: &Catalog) -> MoveOutcome {
        if !catalog.contains(&cmd.item) {
            debug!("move of unknown item {} ignored", cmd.item);
            return MoveOutcome::Rejected(RejectReason::UnknownItem);
        }

        let source = self.find_slot(&cmd.item);
        if let (Some((actual, _)), ContainerRef::Slot(claimed)) = (source, cmd.from) {
            if actual != claimed {
                debug!(
                    "move of {} claimed source {} but it sits in {}",
                    cmd.item, claimed, actual
                );
            }
        }

        let dest = match cmd.to {
            ContainerRef::Bank(_) => {
                return match source {
                    Some((key, idx)) => {
                        self.slot_mut(key).remove(idx);
                        MoveOutcome::Unplaced { from: key }
                    }
                    None => MoveOutcome::Unchanged,
                };
            }
            ContainerRef::Slot(key) => key,
        };

        if catalog.position_of(&cmd.item) != Some(dest.position) {
            return MoveOutcome::Rejected(RejectReason::PositionMismatch);
        }

        match source {
            Some((key, old_idx)) if key == dest => {
                let slot = self.slot_mut(dest);
                let last = slot.len().saturating_sub(1);
                let new_idx = cmd.target_index.filter(|&i| i <= last).unwrap_or(last);
                if new_idx == old_idx {
                    return MoveOutcome::Unchanged;
                }
                let item = slot.remove(old_idx);
                slot.insert(new_idx, item);
                MoveOutcome::Reordered {
                    slot: dest,
                    from: old_idx,
                    to: new_idx,
                }
            }
            _ => {
                if let Some((key, idx)) = source {
                    self.slot_mut(key).remove(idx);
                }
                let slot = self.slot_mut(dest);
                let index = match cmd.target_index {
                    Some(i) if i < slot.len() => {
                        slot.insert(i, cmd.item.clone());
                        i
                    }
                    _ => {
                        slot.push(cmd.item.clone());
                        slot.len() - 1
                    }
                };
                MoveOutcome::Placed { slot: dest, index }
            }
        }
    }

    /// Check the board against the catalog's invariants.
    pub fn validate(&self, catalog: &Catalog) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut seen: HashMap<&str, Vec<SlotKey>> = HashMap::new();

        for (key, ids) in &self.slots {
            for id in ids {
                seen.entry(id.as_str()).or_default().push(*key);
                match catalog.position_of(id) {
                    _ if !catalog.contains(id) => violations.push(Violation::UnknownItem {
                        item: id.clone(),
                        slot: *key,
                    }),
                    Some(pos) if pos == key.position => {}
                    _ => violations.push(Violation::PositionMismatch {
                        item: id.clone(),
                        slot: *key,
                    }),
                }
            }
        }

        let mut duplicates: Vec<_> = seen
            .into_iter()
            .filter(|(_, slots)| slots.len() > 1)
            .collect();
        duplicates.sort_by(|a, b| a.0.cmp(b.0));
        violations.extend(duplicates.into_iter().map(|(id, slots)| {
            Violation::DuplicatePlacement {
                item: id.to_string(),
                slots,
            }
        }));

        violations
    }

    fn slot_mut(&mut self, key: SlotKey) -> &mut Vec<PlayerId> {
        self.slots.entry(key).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Round;

    fn player(id: &str, last: &str, position: &str) -> Player {
        Player {
            id: id.into(),
            first: format!("First{id}"),
            last: last.into(),
            position: position.into(),
            school: "State".into(),
            eligible: "2026".into(),
            slug: id.into(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            player("A", "Adams", "QB"),
            player("B", "Brown", "QB"),
            player("C", "Clark", "QB"),
            player("D", "Davis", "RB"),
            player("E", "Evans", "CB"),
            player("F", "Ford", "S"),
        ])
    }

    fn key(round: Round, pos: Position) -> SlotKey {
        SlotKey::new(round, pos)
    }

    fn r1_qb() -> SlotKey {
        key(Round::First, Position::Quarterback)
    }

    fn place(board: &mut Board, cat: &Catalog, item: &str, to: SlotKey) {
        let outcome = board.move_item(
            &MoveCommand {
                item: item.into(),
                from: board.locate_container(item, cat).unwrap(),
                to: ContainerRef::Slot(to),
                target_index: None,
            },
            cat,
        );
        assert!(outcome.is_mutation(), "setup move failed: {outcome:?}");
    }

    #[test]
    fn empty_board_has_every_slot() {
        let board = Board::empty();
        assert_eq!(board.slots().count(), 72);
        assert!(board.slots().all(|(_, ids)| ids.is_empty()));
    }

    #[test]
    fn insert_from_bank_before_target() {
        let cat = catalog();
        let mut board = Board::empty();
        place(&mut board, &cat, "A", r1_qb());
        place(&mut board, &cat, "B", r1_qb());

        let outcome = board.move_item(
            &MoveCommand {
                item: "C".into(),
                from: ContainerRef::Bank(Position::Quarterback),
                to: ContainerRef::Slot(r1_qb()),
                target_index: Some(1),
            },
            &cat,
        );

        assert_eq!(outcome, MoveOutcome::Placed { slot: r1_qb(), index: 1 });
        assert_eq!(board.slot(r1_qb()), ["A", "C", "B"]);
        assert!(!board.bank(&cat).contains("C"));
    }

    #[test]
    fn position_mismatch_is_rejected_without_change() {
        let cat = catalog();
        let board = Board::empty();
        let (next, outcome) = board.apply(
            &MoveCommand {
                item: "D".into(),
                from: ContainerRef::Bank(Position::RunningBack),
                to: ContainerRef::Slot(key(Round::Second, Position::WideReceiver)),
                target_index: None,
            },
            &cat,
        );
        assert_eq!(outcome, MoveOutcome::Rejected(RejectReason::PositionMismatch));
        assert_eq!(next, board);
    }

    #[test]
    fn corners_and_safeties_slot_under_db() {
        let cat = catalog();
        let mut board = Board::empty();
        let db = key(Round::Third, Position::DefensiveBack);
        place(&mut board, &cat, "E", db);
        place(&mut board, &cat, "F", db);
        assert_eq!(board.slot(db), ["E", "F"]);
    }

    #[test]
    fn reorder_within_slot_is_a_splice() {
        let cat = catalog();
        let mut board = Board::empty();
        for id in ["A", "B", "C"] {
            place(&mut board, &cat, id, r1_qb());
        }

        let outcome = board.move_item(
            &MoveCommand {
                item: "A".into(),
                from: ContainerRef::Slot(r1_qb()),
                to: ContainerRef::Slot(r1_qb()),
                target_index: Some(2),
            },
            &cat,
        );
        assert_eq!(outcome, MoveOutcome::Reordered { slot: r1_qb(), from: 0, to: 2 });
        assert_eq!(board.slot(r1_qb()), ["B", "C", "A"]);

        // Dropping on the container itself moves to the bottom.
        board.move_item(
            &MoveCommand {
                item: "B".into(),
                from: ContainerRef::Slot(r1_qb()),
                to: ContainerRef::Slot(r1_qb()),
                target_index: None,
            },
            &cat,
        );
        assert_eq!(board.slot(r1_qb()), ["C", "A", "B"]);
    }

    #[test]
    fn reorder_onto_own_index_is_unchanged() {
        let cat = catalog();
        let mut board = Board::empty();
        place(&mut board, &cat, "A", r1_qb());
        let outcome = board.move_item(
            &MoveCommand {
                item: "A".into(),
                from: ContainerRef::Slot(r1_qb()),
                to: ContainerRef::Slot(r1_qb()),
                target_index: Some(0),
            },
            &cat,
        );
        assert_eq!(outcome, MoveOutcome::Unchanged);
    }

    #[test]
    fn cross_slot_move_removes_from_source() {
        let cat = catalog();
        let mut board = Board::empty();
        place(&mut board, &cat, "A", r1_qb());
        let r2_qb = key(Round::Second, Position::Quarterback);
        place(&mut board, &cat, "A", r2_qb);
        assert!(board.slot(r1_qb()).is_empty());
        assert_eq!(board.slot(r2_qb), ["A"]);
    }

    #[test]
    fn stale_source_never_duplicates() {
        let cat = catalog();
        let mut board = Board::empty();
        place(&mut board, &cat, "A", r1_qb());
        let r3_qb = key(Round::Third, Position::Quarterback);
        board.move_item(
            &MoveCommand {
                item: "A".into(),
                from: ContainerRef::Bank(Position::Quarterback),
                to: ContainerRef::Slot(r3_qb),
                target_index: None,
            },
            &cat,
        );
        assert!(board.slot(r1_qb()).is_empty());
        assert_eq!(board.slot(r3_qb), ["A"]);
        assert!(board.validate(&cat).is_empty());
    }

    #[test]
    fn drop_on_bank_unplaces() {
        let cat = catalog();
        let mut board = Board::empty();
        place(&mut board, &cat, "D", key(Round::First, Position::RunningBack));
        let outcome = board.move_item(
            &MoveCommand {
                item: "D".into(),
                from: ContainerRef::Slot(key(Round::First, Position::RunningBack)),
                to: ContainerRef::Bank(Position::RunningBack),
                target_index: None,
            },
            &cat,
        );
        assert!(matches!(outcome, MoveOutcome::Unplaced { .. }));
        assert_eq!(board, Board::empty());

        let outcome = board.move_item(
            &MoveCommand {
                item: "D".into(),
                from: ContainerRef::Bank(Position::RunningBack),
                to: ContainerRef::Bank(Position::RunningBack),
                target_index: None,
            },
            &cat,
        );
        assert_eq!(outcome, MoveOutcome::Unchanged);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let cat = catalog();
        let mut board = Board::empty();
        let outcome = board.move_item(
            &MoveCommand {
                item: "ghost".into(),
                from: ContainerRef::Bank(Position::Quarterback),
                to: ContainerRef::Slot(r1_qb()),
                target_index: None,
            },
            &cat,
        );
        assert_eq!(outcome, MoveOutcome::Rejected(RejectReason::UnknownItem));
        assert_eq!(board.locate_container("ghost", &cat), None);
    }

    #[test]
    fn locate_container_reports_bank_column() {
        let cat = catalog();
        let board = Board::empty();
        assert_eq!(
            board.locate_container("E", &cat),
            Some(ContainerRef::Bank(Position::DefensiveBack))
        );
    }

    #[test]
    fn bank_is_sorted_by_surname() {
        let cat = Catalog::new(vec![
            player("x", "zimmer", "WR"),
            player("y", "Allen", "WR"),
            player("z", "Moss", "WR"),
        ]);
        let board = Board::empty();
        let bank = board.bank(&cat);
        let names: Vec<&str> = bank
            .column(Position::WideReceiver)
            .iter()
            .map(|p| p.surname())
            .collect();
        assert_eq!(names, vec!["Allen", "Moss", "zimmer"]);
        assert_eq!(bank.len(), 3);
    }

    #[test]
    fn from_slots_fills_missing_and_drops_duplicates() {
        let mut stored = BTreeMap::new();
        stored.insert(r1_qb(), vec!["A".to_string(), "B".to_string()]);
        stored.insert(
            key(Round::Second, Position::Quarterback),
            vec!["A".to_string(), "C".to_string()],
        );

        let (board, repairs) = Board::from_slots(stored);
        assert_eq!(board.slots().count(), 72);
        assert_eq!(repairs.missing_slots, 70);
        assert_eq!(repairs.duplicates_dropped, vec!["A".to_string()]);
        assert_eq!(board.slot(key(Round::Second, Position::Quarterback)), ["C"]);
    }

    #[test]
    fn resolved_slot_skips_stale_ids() {
        let cat = catalog();
        let mut stored: BTreeMap<SlotKey, Vec<PlayerId>> =
            SlotKey::all().map(|k| (k, Vec::new())).collect();
        stored.insert(r1_qb(), vec!["A".into(), "retired".into(), "B".into()]);
        let (board, _) = Board::from_slots(stored);

        let names: Vec<&str> = board
            .resolved_slot(r1_qb(), &cat)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(
            board.validate(&cat),
            vec![Violation::UnknownItem {
                item: "retired".into(),
                slot: r1_qb()
            }]
        );
    }
}
