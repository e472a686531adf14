// Messages between the front-end and the application event loop.

use chrono::{DateTime, Utc};

use whiteboard_core::board::MoveOutcome;
use whiteboard_core::container::{ContainerRef, SlotKey};
use whiteboard_core::player::{Player, PlayerId};
use whiteboard_core::position::{Position, Round};
use whiteboard_core::session::{BoardSession, BoardStatus};

/// User intents, sent from the front-end to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SignIn(String),
    SignOut,
    SelectClass(String),
    DragStart(PlayerId),
    DragEnd { item: PlayerId, over: String },
    /// Place `item` in `to` without a gesture; the source is looked up on
    /// the board.
    Move {
        item: PlayerId,
        to: ContainerRef,
        index: Option<usize>,
    },
    Save,
    Show,
    Quit,
}

/// Updates pushed from the event loop to the front-end.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// Full board and bank after a load or a change.
    Snapshot(Box<BoardSnapshot>),
    /// Save button state changed.
    Status(BoardStatus),
    /// A drop resolved; `Rejected` means the card snaps back.
    MoveResolved(MoveOutcome),
    /// Load or save failure, or a refused command. Non-fatal.
    Error(String),
}

/// A player card as shown on the board or in the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSnapshot {
    pub id: PlayerId,
    pub label: String,
    /// Raw position, e.g. "CB" for a card in the DB column.
    pub position: String,
    pub school: String,
    pub slug: String,
}

impl From<&Player> for CardSnapshot {
    fn from(p: &Player) -> Self {
        CardSnapshot {
            id: p.id.clone(),
            label: p.display_name(),
            position: p.position.clone(),
            school: p.school.clone(),
            slug: p.slug.clone(),
        }
    }
}

/// One board row: a round with a card list per position column.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    pub round: Round,
    pub columns: Vec<(Position, Vec<CardSnapshot>)>,
}

/// Everything a renderer needs to draw the page.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub owner: Option<String>,
    pub class: String,
    pub status: BoardStatus,
    pub updated_at: Option<DateTime<Utc>>,
    pub rows: Vec<RowSnapshot>,
    pub bank: Vec<(Position, Vec<CardSnapshot>)>,
}

impl BoardSnapshot {
    /// Capture the session. Board ids missing from the catalog are left out.
    pub fn capture(session: &BoardSession) -> Self {
        let board = session.board();
        let catalog = session.catalog();

        let rows: Vec<RowSnapshot> = Round::ALL
            .into_iter()
            .map(|round| RowSnapshot {
                round,
                columns: Position::ALL
                    .into_iter()
                    .map(|pos| {
                        let cards: Vec<CardSnapshot> = board
                            .resolved_slot(SlotKey::new(round, pos), catalog)
                            .into_iter()
                            .map(CardSnapshot::from)
                            .collect();
                        (pos, cards)
                    })
                    .collect(),
            })
            .collect();

        let bank: Vec<(Position, Vec<CardSnapshot>)> = session
            .bank()
            .columns()
            .map(|(pos, players)| {
                let cards = players.iter().map(|p| CardSnapshot::from(*p)).collect::<Vec<_>>();
                (pos, cards)
            })
            .collect();

        BoardSnapshot {
            owner: session.owner().map(|o| o.to_string()),
            class: session.context().to_string(),
            status: session.status(),
            updated_at: session.updated_at(),
            rows,
            bank,
        }
    }

    pub fn placed_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.columns.iter())
            .map(|(_, cards)| cards.len())
            .sum()
    }

    pub fn bank_count(&self) -> usize {
        self.bank.iter().map(|(_, cards)| cards.len()).sum()
    }

    /// Cards in one slot, in ranking order.
    pub fn slot(&self, round: Round, position: Position) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.round == round)
            .flat_map(|r| r.columns.iter())
            .filter(|(pos, _)| *pos == position)
            .flat_map(|(_, cards)| cards.iter().map(|c| c.id.as_str()))
            .collect()
    }
}
