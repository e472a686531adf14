// Whiteboard core: the draft ranking board, its session lifecycle, and the
// catalog and store interfaces it depends on.

pub mod board;
pub mod catalog;
pub mod container;
pub mod document;
pub mod error;
pub mod player;
pub mod position;
pub mod session;
pub mod store;

pub use board::{Board, MoveCommand, MoveOutcome, RejectReason};
pub use catalog::{Catalog, PlayerCatalog};
pub use container::{ContainerRef, SlotKey};
pub use document::{document_key, BoardDocument};
pub use player::{Player, PlayerId};
pub use position::{normalize_position, Position, Round};
pub use session::{BoardSession, BoardStatus, OwnerId};
pub use store::BoardStore;
