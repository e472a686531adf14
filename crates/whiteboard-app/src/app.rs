// Application state and orchestration logic.
//
// The event loop owns the board session exclusively. User commands mutate it
// synchronously; loads and saves run on spawned tasks and report back over
// the task channel, carrying the ticket they were issued with so stale
// results can be recognized and dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use whiteboard_core::error::{LoadError, StoreError};
use whiteboard_core::session::{BoardSession, LoadTicket, LoadedBoard, OwnerId, SaveTicket, SessionState};
use whiteboard_core::{BoardStore, MoveCommand, PlayerCatalog};

use crate::config::Config;
use crate::protocol::{BoardSnapshot, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Completion of a spawned load or save.
#[derive(Debug)]
pub enum TaskEvent {
    Loaded {
        ticket: LoadTicket,
        result: Result<LoadedBoard, LoadError>,
    },
    Saved {
        ticket: SaveTicket,
        result: Result<DateTime<Utc>, StoreError>,
    },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub session: BoardSession,
    catalog: Arc<dyn PlayerCatalog>,
    store: Arc<dyn BoardStore>,
    /// Spawned tasks report back through a clone of this sender.
    task_tx: mpsc::Sender<TaskEvent>,
}

impl AppState {
    /// Create the state with no signed-in user, on the configured default
    /// draft class.
    pub fn new(
        config: Config,
        catalog: Arc<dyn PlayerCatalog>,
        store: Arc<dyn BoardStore>,
        task_tx: mpsc::Sender<TaskEvent>,
    ) -> Self {
        let session = BoardSession::new(None, config.board.default_class.clone());
        AppState {
            config,
            session,
            catalog,
            store,
            task_tx,
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(&self.session)
    }

    fn spawn_load(&self, ticket: LoadTicket) {
        let catalog = Arc::clone(&self.catalog);
        let store = Arc::clone(&self.store);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = ticket.fetch(catalog.as_ref(), store.as_ref()).await;
            if tx.send(TaskEvent::Loaded { ticket, result }).await.is_err() {
                debug!("Event loop gone before load completed");
            }
        });
    }

    fn spawn_save(&self, ticket: SaveTicket) {
        let store = Arc::clone(&self.store);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = ticket.execute(store.as_ref()).await;
            if tx.send(TaskEvent::Saved { ticket, result }).await.is_err() {
                debug!("Event loop gone before save completed");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the front-end
/// 2. Completions of spawned load/save tasks
///
/// On `Quit` with a save in flight, the loop waits for that save to land
/// before exiting.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut task_rx: mpsc::Receiver<TaskEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut quitting = false;
    let mut commands_open = true;

    loop {
        if quitting && state.session.state() != SessionState::Saving {
            break;
        }

        tokio::select! {
            cmd = cmd_rx.recv(), if commands_open && !quitting => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        if state.session.has_unsaved_changes() {
                            warn!("Exiting with unsaved changes on {}", state.session.context());
                        }
                        quitting = true;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        commands_open = false;
                        quitting = true;
                    }
                }
            }

            event = task_rx.recv() => {
                match event {
                    Some(event) => handle_task_event(&mut state, event, &ui_tx).await,
                    None => {
                        // AppState holds a sender, so this only happens if it was dropped.
                        warn!("Task channel closed");
                        break;
                    }
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Handle a user command from the front-end.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SignIn(owner) => {
            let owner = owner.trim().to_string();
            if owner.is_empty() {
                send(ui_tx, UiUpdate::Error("a user id is required to sign in".into())).await;
                return;
            }
            match state.session.sign_in(OwnerId::new(owner)) {
                Ok(ticket) => {
                    state.spawn_load(ticket);
                    send(ui_tx, UiUpdate::Status(state.session.status())).await;
                }
                Err(e) => send(ui_tx, UiUpdate::Error(e.to_string())).await,
            }
        }
        UserCommand::SignOut => match state.session.sign_out() {
            Ok(()) => send_snapshot(state, ui_tx).await,
            Err(e) => send(ui_tx, UiUpdate::Error(e.to_string())).await,
        },
        UserCommand::SelectClass(class) => {
            if !state.config.is_known_class(&class) {
                send(
                    ui_tx,
                    UiUpdate::Error(format!(
                        "unknown draft class {class}; choose one of {}",
                        state.config.board.draft_classes.join(", ")
                    )),
                )
                .await;
                return;
            }
            info!("Switching to draft class {}", class);
            match state.session.select_context(class) {
                Ok(ticket) => {
                    state.spawn_load(ticket);
                    send(ui_tx, UiUpdate::Status(state.session.status())).await;
                }
                Err(e) => send(ui_tx, UiUpdate::Error(e.to_string())).await,
            }
        }
        UserCommand::DragStart(item) => {
            if !state.session.drag_start(&item) {
                debug!("Drag of {} ignored", item);
            }
        }
        UserCommand::DragEnd { item, over } => {
            let outcome = state.session.drag_end(&item, &over);
            send(ui_tx, UiUpdate::MoveResolved(outcome)).await;
            if outcome.is_mutation() {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::Move { item, to, index } => {
            // Unknown items have no source; the reducer's guards reject them.
            let from = state.session.locate_container(&item).unwrap_or(to);
            let outcome = state.session.move_item(&MoveCommand {
                item,
                from,
                to,
                target_index: index,
            });
            send(ui_tx, UiUpdate::MoveResolved(outcome)).await;
            if outcome.is_mutation() {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::Save => match state.session.begin_save() {
            Ok(ticket) => {
                info!("Saving board {}", ticket.key());
                state.spawn_save(ticket);
                send(ui_tx, UiUpdate::Status(state.session.status())).await;
            }
            Err(e) => send(ui_tx, UiUpdate::Error(e.to_string())).await,
        },
        UserCommand::Show => send_snapshot(state, ui_tx).await,
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Apply a finished load or save to the session.
async fn handle_task_event(state: &mut AppState, event: TaskEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        TaskEvent::Loaded { ticket, result } => match state.session.finish_load(&ticket, result) {
            Ok(true) => send_snapshot(state, ui_tx).await,
            Ok(false) => {}
            Err(e) => {
                send(ui_tx, UiUpdate::Error(format!("could not load your board: {e}"))).await;
                send(ui_tx, UiUpdate::Status(state.session.status())).await;
            }
        },
        TaskEvent::Saved { ticket, result } => {
            if let Err(e) = state.session.finish_save(&ticket, result) {
                send(ui_tx, UiUpdate::Error(format!("save failed: {e}"))).await;
            }
            send(ui_tx, UiUpdate::Status(state.session.status())).await;
        }
    }
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    send(ui_tx, UiUpdate::Snapshot(Box::new(state.snapshot()))).await;
}

async fn send(ui_tx: &mpsc::Sender<UiUpdate>, update: UiUpdate) {
    if ui_tx.send(update).await.is_err() {
        debug!("UI channel closed, dropping update");
    }
}
