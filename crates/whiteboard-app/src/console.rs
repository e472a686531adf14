// Line console: parses stdin commands into UserCommand messages and renders
// UiUpdate messages as text.
//
// The console owns a `ConsoleView` mirroring the last snapshot the event loop
// pushed. Commands that would throw away unsaved edits (switching class or
// user, signing out, quitting) must be entered twice.

use std::fmt::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use whiteboard_core::board::{MoveOutcome, RejectReason};
use whiteboard_core::container::ContainerRef;
use whiteboard_core::session::BoardStatus;

use crate::protocol::{BoardSnapshot, UiUpdate, UserCommand};

pub const HELP: &str = "\
commands:
  login <user>                      sign in and load your board
  logout                            sign out
  class <year>                      switch draft class
  drag <player>                     pick up a player
  drop <player> <target>            drop onto a container or a player
  move <player> <container> [index] place a player directly
  save                              save the board
  show                              print the board
  bank                              print unranked players
  help                              this text
  quit                              exit
containers look like \"ROUND 1::QB\", \"UDFA::DB\" or \"bank::WR\"";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Forward to the event loop.
    Send(UserCommand),
    /// Print the bank from the last snapshot.
    Bank,
    Help,
}

/// Parse one input line. Blank lines are an error with an empty message.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(String::new());
    };
    let args: Vec<&str> = words.collect();

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "login" => UserCommand::SignIn(single(&args, "login <user>")?.to_string()),
        "logout" => UserCommand::SignOut,
        "class" => UserCommand::SelectClass(single(&args, "class <year>")?.to_string()),
        "drag" => UserCommand::DragStart(single(&args, "drag <player>")?.to_string()),
        "drop" => {
            let [item, over @ ..] = args.as_slice() else {
                return Err("usage: drop <player> <target>".into());
            };
            if over.is_empty() {
                return Err("usage: drop <player> <target>".into());
            }
            UserCommand::DragEnd {
                item: item.to_string(),
                over: over.join(" "),
            }
        }
        "move" => parse_move(&args)?,
        "save" => UserCommand::Save,
        "show" => UserCommand::Show,
        "bank" => return Ok(ConsoleCommand::Bank),
        "help" | "?" => return Ok(ConsoleCommand::Help),
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(ConsoleCommand::Send(cmd))
}

fn single<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, String> {
    match args {
        [one] => Ok(*one),
        _ => Err(format!("usage: {usage}")),
    }
}

/// `move <player> <container> [index]`. Container ids contain a space, so
/// everything between the player and an optional trailing number is the
/// container.
fn parse_move(args: &[&str]) -> Result<UserCommand, String> {
    const USAGE: &str = "usage: move <player> <container> [index]";
    let [item, rest @ ..] = args else {
        return Err(USAGE.into());
    };
    let (container, index) = match rest {
        [head @ .., last] if !head.is_empty() => match last.parse::<usize>() {
            Ok(i) => (head.join(" "), Some(i)),
            Err(_) => (rest.join(" "), None),
        },
        [_] => (rest.join(" "), None),
        _ => return Err(USAGE.into()),
    };
    let to = ContainerRef::parse(&container)
        .ok_or_else(|| format!("'{container}' is not a board or bank container"))?;
    Ok(UserCommand::Move {
        item: item.to_string(),
        to,
        index,
    })
}

// ---------------------------------------------------------------------------
// ConsoleView
// ---------------------------------------------------------------------------

/// What the front-end should do with a line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    Send(UserCommand),
    Print(String),
    Nothing,
}

/// Console-local mirror of the application state.
#[derive(Debug, Default)]
pub struct ConsoleView {
    snapshot: Option<BoardSnapshot>,
    status: Option<BoardStatus>,
    /// A destructive command waiting to be repeated.
    pending: Option<UserCommand>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<BoardStatus> {
        self.status
    }

    pub fn snapshot(&self) -> Option<&BoardSnapshot> {
        self.snapshot.as_ref()
    }

    /// Interpret one input line.
    pub fn handle_line(&mut self, line: &str) -> LineAction {
        let parsed = match parse_command(line) {
            Ok(parsed) => parsed,
            Err(msg) if msg.is_empty() => return LineAction::Nothing,
            Err(msg) => {
                self.pending = None;
                return LineAction::Print(msg);
            }
        };

        let cmd = match parsed {
            ConsoleCommand::Send(cmd) => cmd,
            ConsoleCommand::Bank => {
                return LineAction::Print(match &self.snapshot {
                    Some(snapshot) => render_bank(snapshot),
                    None => "nothing loaded yet".into(),
                });
            }
            ConsoleCommand::Help => return LineAction::Print(HELP.into()),
        };

        let confirmed = self.pending.take().as_ref() == Some(&cmd);
        if discards_edits(&cmd) && self.status == Some(BoardStatus::Dirty) && !confirmed {
            self.pending = Some(cmd);
            return LineAction::Print(
                "you have unsaved changes; repeat the command to discard them, or 'save' first"
                    .into(),
            );
        }
        LineAction::Send(cmd)
    }

    /// Apply an update from the event loop, returning text to print.
    pub fn apply(&mut self, update: UiUpdate) -> Option<String> {
        match update {
            UiUpdate::Snapshot(snapshot) => {
                self.status = Some(snapshot.status);
                let text = render_board(&snapshot);
                self.snapshot = Some(*snapshot);
                Some(text)
            }
            UiUpdate::Status(status) => {
                let changed = self.status != Some(status);
                self.status = Some(status);
                if let Some(snapshot) = self.snapshot.as_mut() {
                    snapshot.status = status;
                }
                changed.then(|| format!("[{status}]"))
            }
            UiUpdate::MoveResolved(outcome) => describe_outcome(outcome),
            UiUpdate::Error(msg) => Some(format!("error: {msg}")),
        }
    }
}

fn discards_edits(cmd: &UserCommand) -> bool {
    matches!(
        cmd,
        UserCommand::SignIn(_) | UserCommand::SignOut | UserCommand::SelectClass(_) | UserCommand::Quit
    )
}

// ---------------------------------------------------------------------------
// Front-end loop
// ---------------------------------------------------------------------------

/// Read commands from stdin and print updates until the event loop shuts
/// down. End of input counts as `quit`.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut view = ConsoleView::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => match view.handle_line(&line) {
                        LineAction::Send(cmd) => {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() {
                                break;
                            }
                            input_open = !quit;
                        }
                        LineAction::Print(text) => println!("{text}"),
                        LineAction::Nothing => {}
                    },
                    None => {
                        info!("End of input, quitting");
                        input_open = false;
                        if cmd_tx.send(UserCommand::Quit).await.is_err() {
                            break;
                        }
                    }
                }
            }

            update = ui_rx.recv() => {
                match update {
                    Some(update) => {
                        if let Some(text) = view.apply(update) {
                            println!("{text}");
                        }
                    }
                    // The event loop dropped its sender: it has exited.
                    None => break,
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// The board as one line per round, listing only occupied columns.
pub fn render_board(snapshot: &BoardSnapshot) -> String {
    let mut out = String::new();
    let owner = snapshot.owner.as_deref().unwrap_or("(signed out)");
    let _ = write!(out, "{owner} | class {} | {}", snapshot.class, snapshot.status);
    if let Some(at) = snapshot.updated_at {
        let _ = write!(out, " | last saved {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    out.push('\n');

    for row in &snapshot.rows {
        let _ = write!(out, "{:<9}", row.round.label());
        let filled: Vec<String> = row
            .columns
            .iter()
            .filter(|(_, cards)| !cards.is_empty())
            .map(|(pos, cards)| {
                let names: Vec<&str> = cards.iter().map(|c| c.label.as_str()).collect();
                format!("{}: {}", pos.code(), names.join(", "))
            })
            .collect();
        if filled.is_empty() {
            out.push_str(" -");
        } else {
            let _ = write!(out, " {}", filled.join(" | "));
        }
        out.push('\n');
    }
    let _ = write!(
        out,
        "{} ranked, {} in the bank",
        snapshot.placed_count(),
        snapshot.bank_count()
    );
    out
}

/// Unplaced players per column, with ids for use in commands.
pub fn render_bank(snapshot: &BoardSnapshot) -> String {
    let mut out = String::new();
    for (pos, cards) in &snapshot.bank {
        let _ = write!(out, "{:<5}", pos.code());
        if cards.is_empty() {
            out.push('-');
        } else {
            let entries: Vec<String> = cards
                .iter()
                .map(|c| format!("{} [{}] {}", c.label, c.id, c.school))
                .collect();
            out.push_str(&entries.join("; "));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Feedback for a resolved drop. Placements are shown by the snapshot that
/// follows, so only snap-backs and no-ops produce text.
pub fn describe_outcome(outcome: MoveOutcome) -> Option<String> {
    match outcome {
        MoveOutcome::Rejected(reason) => Some(
            match reason {
                RejectReason::PositionMismatch => "that player does not belong in this column",
                RejectReason::UnknownItem => "no such player in this class",
                RejectReason::NotReady => "the board is busy, try again once it has loaded or saved",
                RejectReason::ReadOnly => "sign in to edit the board",
            }
            .to_string(),
        ),
        MoveOutcome::Unchanged => Some("nothing to change".into()),
        MoveOutcome::Placed { .. } | MoveOutcome::Reordered { .. } | MoveOutcome::Unplaced { .. } => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whiteboard_core::container::SlotKey;
    use whiteboard_core::position::{Position, Round};

    fn send(line: &str) -> UserCommand {
        match parse_command(line) {
            Ok(ConsoleCommand::Send(cmd)) => cmd,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(send("login u1"), UserCommand::SignIn("u1".into()));
        assert_eq!(send("  CLASS 2027 "), UserCommand::SelectClass("2027".into()));
        assert_eq!(send("drag p1"), UserCommand::DragStart("p1".into()));
        assert_eq!(send("save"), UserCommand::Save);
        assert_eq!(send("exit"), UserCommand::Quit);
        assert_eq!(parse_command("bank"), Ok(ConsoleCommand::Bank));
    }

    #[test]
    fn drop_target_may_contain_spaces() {
        assert_eq!(
            send("drop p1 ROUND 3::WR"),
            UserCommand::DragEnd {
                item: "p1".into(),
                over: "ROUND 3::WR".into()
            }
        );
        assert_eq!(
            send("drop p1 p2"),
            UserCommand::DragEnd {
                item: "p1".into(),
                over: "p2".into()
            }
        );
    }

    #[test]
    fn move_parses_container_and_optional_index() {
        let r3_wr = ContainerRef::Slot(SlotKey::new(Round::Third, Position::WideReceiver));
        assert_eq!(
            send("move p1 ROUND 3::WR 2"),
            UserCommand::Move {
                item: "p1".into(),
                to: r3_wr,
                index: Some(2)
            }
        );
        assert_eq!(
            send("move p1 round 3::wr"),
            UserCommand::Move {
                item: "p1".into(),
                to: r3_wr,
                index: None
            }
        );
        assert_eq!(
            send("move p1 bank::DB"),
            UserCommand::Move {
                item: "p1".into(),
                to: ContainerRef::Bank(Position::DefensiveBack),
                index: None
            }
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert_eq!(parse_command("   "), Err(String::new()));
        assert!(parse_command("login").is_err());
        assert!(parse_command("drop p1").is_err());
        assert!(parse_command("move p1 ROUND 9::QB").is_err());
        assert!(parse_command("dance").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn destructive_commands_need_confirmation_when_dirty() {
        let mut view = ConsoleView::new();
        assert_eq!(view.handle_line("class 2027"), LineAction::Send(UserCommand::SelectClass("2027".into())));

        view.apply(UiUpdate::Status(BoardStatus::Dirty));
        assert!(matches!(view.handle_line("class 2027"), LineAction::Print(_)));
        assert_eq!(
            view.handle_line("class 2027"),
            LineAction::Send(UserCommand::SelectClass("2027".into()))
        );

        // A different command in between cancels the pending confirmation.
        assert!(matches!(view.handle_line("quit"), LineAction::Print(_)));
        assert_eq!(view.handle_line("save"), LineAction::Send(UserCommand::Save));
        assert!(matches!(view.handle_line("quit"), LineAction::Print(_)));
    }

    #[test]
    fn status_updates_print_only_on_change() {
        let mut view = ConsoleView::new();
        assert_eq!(view.apply(UiUpdate::Status(BoardStatus::Saving)), Some("[saving]".into()));
        assert_eq!(view.apply(UiUpdate::Status(BoardStatus::Saving)), None);
        assert_eq!(view.status(), Some(BoardStatus::Saving));
    }

    #[test]
    fn rejected_moves_explain_the_snap_back() {
        let text = describe_outcome(MoveOutcome::Rejected(RejectReason::PositionMismatch)).unwrap();
        assert!(text.contains("column"));
        assert!(describe_outcome(MoveOutcome::Unplaced {
            from: SlotKey::new(Round::First, Position::Quarterback)
        })
        .is_none());
    }

    #[test]
    fn bank_without_snapshot() {
        let mut view = ConsoleView::new();
        assert_eq!(view.handle_line("bank"), LineAction::Print("nothing loaded yet".into()));
    }
}
