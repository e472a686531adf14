// Board session: one owner's board for one draft class, with its load/save
// lifecycle.
//
// State machine:
//
//   Uninitialized -> Loading -> Ready(clean) <-> Ready(dirty) -> Saving -> Ready
//
// Loads and saves are split into begin/finish halves around a ticket so the
// I/O can run on another task while the session stays owned by one event
// loop. Every load bumps a generation counter; a finish carrying an older
// generation is discarded, so a slow response for a previous context can
// never overwrite the board now on screen.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::board::{BankView, Board, MoveCommand, MoveOutcome, RejectReason};
use crate::catalog::{Catalog, PlayerCatalog};
use crate::container::ContainerRef;
use crate::document::{document_key, BoardDocument};
use crate::error::{LoadError, SaveError, StoreError};
use crate::player::PlayerId;
use crate::store::BoardStore;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Stable id of the signed-in user, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Saving,
}

/// What the save button should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStatus {
    Uninitialized,
    Loading,
    Clean,
    Dirty,
    Saving,
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BoardStatus::Uninitialized => "not loaded",
            BoardStatus::Loading => "loading",
            BoardStatus::Clean => "saved",
            BoardStatus::Dirty => "unsaved changes",
            BoardStatus::Saving => "saving",
        };
        f.write_str(label)
    }
}

/// An issued load. Carry it to the I/O task and hand it back to
/// [`BoardSession::finish_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    owner: OwnerId,
    context: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn key(&self) -> String {
        document_key(self.owner.as_str(), &self.context)
    }

    /// Read the catalog snapshot and the stored document for this ticket.
    pub async fn fetch(
        &self,
        catalog: &dyn PlayerCatalog,
        store: &dyn BoardStore,
    ) -> Result<LoadedBoard, LoadError> {
        let players = catalog.players_in_class(&self.context).await?;
        let mut document = store.get(&self.key()).await?;
        if let Some(doc) = document.as_mut() {
            doc.fill_identity(self.owner.as_str(), &self.context);
        }
        Ok(LoadedBoard {
            catalog: Catalog::new(players),
            document,
        })
    }
}

/// Result payload of a successful fetch.
#[derive(Debug, Clone)]
pub struct LoadedBoard {
    pub catalog: Catalog,
    /// `None` on first use: the session starts from an empty board.
    pub document: Option<BoardDocument>,
}

/// An issued save, holding the exact document that will be written.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    generation: u64,
    key: String,
    document: BoardDocument,
}

impl SaveTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn document(&self) -> &BoardDocument {
        &self.document
    }

    /// Write the document. No retry; the caller decides.
    pub async fn execute(&self, store: &dyn BoardStore) -> Result<DateTime<Utc>, StoreError> {
        store.put(&self.key, &self.document).await
    }
}

// ---------------------------------------------------------------------------
// BoardSession
// ---------------------------------------------------------------------------

/// The board currently being edited, plus everything needed to persist it.
#[derive(Debug)]
pub struct BoardSession {
    owner: Option<OwnerId>,
    context: String,
    state: SessionState,
    dirty: bool,
    board: Board,
    catalog: Catalog,
    updated_at: Option<DateTime<Utc>>,
    active_drag: Option<PlayerId>,
    /// Incremented on every load and sign-out. u64 will not wrap in practice.
    generation: u64,
}

impl BoardSession {
    pub fn new(owner: Option<OwnerId>, context: impl Into<String>) -> Self {
        BoardSession {
            owner,
            context: context.into(),
            state: SessionState::Uninitialized,
            dirty: false,
            board: Board::empty(),
            catalog: Catalog::default(),
            updated_at: None,
            active_drag: None,
            generation: 0,
        }
    }

    // --- accessors ---

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> BoardStatus {
        match self.state {
            SessionState::Uninitialized => BoardStatus::Uninitialized,
            SessionState::Loading => BoardStatus::Loading,
            SessionState::Saving => BoardStatus::Saving,
            SessionState::Ready if self.dirty => BoardStatus::Dirty,
            SessionState::Ready => BoardStatus::Clean,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when leaving the page now would lose edits.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn bank(&self) -> BankView<'_> {
        self.board.bank(&self.catalog)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn active_drag(&self) -> Option<&str> {
        self.active_drag.as_deref()
    }

    pub fn locate_container(&self, item: &str) -> Option<ContainerRef> {
        self.board.locate_container(item, &self.catalog)
    }

    // --- identity and context ---

    /// Switch the signed-in user and start loading their board. Refused
    /// while a save is in flight.
    pub fn sign_in(&mut self, owner: OwnerId) -> Result<LoadTicket, LoadError> {
        self.ensure_not_saving()?;
        info!("Signed in as {}", owner);
        self.owner = Some(owner);
        self.begin_load()
    }

    /// Drop the owner and the board; an in-flight load result is ignored
    /// when it arrives. Refused while a save is in flight.
    pub fn sign_out(&mut self) -> Result<(), LoadError> {
        self.ensure_not_saving()?;
        if self.dirty {
            warn!("Signing out with unsaved changes on {}", self.context);
        }
        self.owner = None;
        self.reset(SessionState::Uninitialized);
        Ok(())
    }

    /// Switch the active draft class and start loading it. Unsaved edits
    /// to the previous class are discarded. Refused while a save is in
    /// flight.
    pub fn select_context(&mut self, context: impl Into<String>) -> Result<LoadTicket, LoadError> {
        self.ensure_not_saving()?;
        let context = context.into();
        if self.dirty {
            warn!(
                "Discarding unsaved changes on {} to open {}",
                self.context, context
            );
        }
        self.context = context;
        self.begin_load()
    }

    // --- load ---

    /// Enter `Loading` and issue a ticket for the current owner and context.
    pub fn begin_load(&mut self) -> Result<LoadTicket, LoadError> {
        self.ensure_not_saving()?;
        let Some(owner) = self.owner.clone() else {
            self.reset(SessionState::Uninitialized);
            return Err(LoadError::Unauthenticated);
        };
        self.reset(SessionState::Loading);
        debug!(
            "Loading board {} (generation {})",
            document_key(owner.as_str(), &self.context),
            self.generation
        );
        Ok(LoadTicket {
            generation: self.generation,
            owner,
            context: self.context.clone(),
        })
    }

    /// Apply a load result. Returns `Ok(false)` if the ticket is stale and
    /// the result was dropped.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<LoadedBoard, LoadError>,
    ) -> Result<bool, LoadError> {
        if ticket.generation != self.generation {
            debug!(
                "Dropping stale load of {} (generation {} != {})",
                ticket.key(),
                ticket.generation,
                self.generation
            );
            return Ok(false);
        }

        match result {
            Ok(loaded) => {
                let (board, updated_at) = match loaded.document {
                    Some(doc) => {
                        let updated_at = doc.updated_at;
                        (doc.into_board(), updated_at)
                    }
                    None => {
                        info!("No saved board for {}, starting empty", ticket.key());
                        (Board::empty(), None)
                    }
                };
                info!(
                    "Loaded board {}: {} placed, {} players in class",
                    ticket.key(),
                    board.placed_count(),
                    loaded.catalog.len()
                );
                self.board = board;
                self.catalog = loaded.catalog;
                self.updated_at = updated_at;
                self.dirty = false;
                self.state = SessionState::Ready;
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to load board {}: {}", ticket.key(), e);
                self.state = SessionState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Load the current owner's board for the current context.
    pub async fn load(
        &mut self,
        catalog: &dyn PlayerCatalog,
        store: &dyn BoardStore,
    ) -> Result<(), LoadError> {
        let ticket = self.begin_load()?;
        let result = ticket.fetch(catalog, store).await;
        self.finish_load(&ticket, result).map(|_| ())
    }

    // --- gestures and moves ---

    /// Begin dragging `item`. Ignored unless the board is editable.
    pub fn drag_start(&mut self, item: &str) -> bool {
        if self.guard().is_some() || !self.catalog.contains(item) {
            return false;
        }
        self.active_drag = Some(item.to_string());
        true
    }

    /// Finish a drag of `item` over `over_id`, which is either a container
    /// id ("ROUND 1::QB", "bank::DB") or the id of the player dropped onto.
    pub fn drag_end(&mut self, item: &str, over_id: &str) -> MoveOutcome {
        self.active_drag = None;
        if let Some(reason) = self.guard() {
            return MoveOutcome::Rejected(reason);
        }

        let Some(from) = self.locate_container(item) else {
            return MoveOutcome::Rejected(RejectReason::UnknownItem);
        };

        let (to, target_index) = match ContainerRef::parse(over_id) {
            Some(container) => (container, None),
            None => match self.board.find_slot(over_id) {
                Some((key, idx)) => (ContainerRef::Slot(key), Some(idx)),
                None => match self.locate_container(over_id) {
                    Some(container) => (container, None),
                    None => {
                        debug!("Drop of {} over unknown target {} ignored", item, over_id);
                        return MoveOutcome::Unchanged;
                    }
                },
            },
        };

        self.move_item(&MoveCommand {
            item: item.to_string(),
            from,
            to,
            target_index,
        })
    }

    /// Apply a move through the reducer, marking the board dirty if it
    /// changed.
    pub fn move_item(&mut self, cmd: &MoveCommand) -> MoveOutcome {
        if let Some(reason) = self.guard() {
            return MoveOutcome::Rejected(reason);
        }
        let outcome = self.board.move_item(cmd, &self.catalog);
        if outcome.is_mutation() {
            self.dirty = true;
        }
        debug!("move {} -> {}: {:?}", cmd.item, cmd.to, outcome);
        outcome
    }

    // --- save ---

    /// Enter `Saving` and snapshot the board into a document. The board is
    /// frozen until [`BoardSession::finish_save`].
    pub fn begin_save(&mut self) -> Result<SaveTicket, SaveError> {
        let Some(owner) = self.owner.as_ref() else {
            return Err(SaveError::Unauthenticated);
        };
        match self.state {
            SessionState::Saving => {
                warn!("Save requested while a save is in flight");
                return Err(SaveError::InProgress);
            }
            SessionState::Uninitialized | SessionState::Loading => {
                return Err(SaveError::NotReady);
            }
            SessionState::Ready => {}
        }

        let document = BoardDocument::from_board(owner.as_str(), &self.context, &self.board);
        self.state = SessionState::Saving;
        Ok(SaveTicket {
            generation: self.generation,
            key: document.key(),
            document,
        })
    }

    /// Apply a save result. Failures keep the unsaved flag set and are
    /// returned once to the caller.
    pub fn finish_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<DateTime<Utc>, StoreError>,
    ) -> Result<DateTime<Utc>, SaveError> {
        if ticket.generation != self.generation {
            debug!("Save of {} finished after the session moved on", ticket.key);
            return result.map_err(SaveError::from);
        }

        self.state = SessionState::Ready;
        match result {
            Ok(at) => {
                info!("Saved board {}", ticket.key);
                self.dirty = false;
                self.updated_at = Some(at);
                Ok(at)
            }
            Err(e) => {
                warn!("Failed to save board {}: {}", ticket.key, e);
                Err(SaveError::Store(e))
            }
        }
    }

    /// Persist the board now.
    pub async fn save(&mut self, store: &dyn BoardStore) -> Result<DateTime<Utc>, SaveError> {
        let ticket = self.begin_save()?;
        let result = ticket.execute(store).await;
        self.finish_save(&ticket, result)
    }

    // --- helpers ---

    /// Reason the board cannot be edited right now, if any.
    fn guard(&self) -> Option<RejectReason> {
        if self.owner.is_none() {
            Some(RejectReason::ReadOnly)
        } else if self.state != SessionState::Ready {
            Some(RejectReason::NotReady)
        } else {
            None
        }
    }

    /// `Saving` is only left through [`BoardSession::finish_save`].
    fn ensure_not_saving(&self) -> Result<(), LoadError> {
        if self.state == SessionState::Saving {
            warn!("Refusing to leave {} while its save is in flight", self.context);
            return Err(LoadError::SaveInProgress);
        }
        Ok(())
    }

    fn reset(&mut self, state: SessionState) {
        self.generation += 1;
        self.state = state;
        self.dirty = false;
        self.board = Board::empty();
        self.catalog = Catalog::default();
        self.updated_at = None;
        self.active_drag = None;
    }
}
