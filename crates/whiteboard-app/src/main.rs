// Whiteboard entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout belongs to the console)
// 2. Load config
// 3. Open database
// 4. `whiteboard import <file>`: import the CSV and exit
// 5. Otherwise import the configured CSV, if any
// 6. Create mpsc channels and the app state
// 7. Spawn app logic task
// 8. Run the console until the user quits
// 9. Wait for the app task (a save may still be landing)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use whiteboard_app::{app, config, console, db, import};
use whiteboard_core::{BoardStore, PlayerCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Whiteboard starting up");

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: classes {:?}, default {}",
        config.board.draft_classes, config.board.default_class
    );

    let db = Arc::new(db::Database::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);

    match args.as_slice() {
        [cmd, file] if cmd == "import" => {
            let count = import_catalog(&db, Path::new(file))?;
            println!("imported {count} players from {file}");
            return Ok(());
        }
        [] => {}
        _ => {
            anyhow::bail!("usage: whiteboard [import <players.csv>]");
        }
    }

    if let Some(file) = &config.catalog.import_csv {
        if let Err(e) = import_catalog(&db, Path::new(file)) {
            warn!("Configured catalog import failed: {:#}", e);
            eprintln!("warning: could not import {file}: {e:#}");
        }
    }

    let players = db.player_count().context("failed to count players")?;
    info!("{} players in catalog", players);
    if players == 0 {
        println!("the player catalog is empty; run `whiteboard import <players.csv>` first");
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (task_tx, task_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let catalog: Arc<dyn PlayerCatalog> = db.clone();
    let store: Arc<dyn BoardStore> = db;
    let app_state = app::AppState::new(config, catalog, store, task_tx);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, task_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // Blocks until the user quits or stdin closes.
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    if tokio::time::timeout(Duration::from_secs(10), app_handle).await.is_err() {
        warn!("Application loop did not stop in time");
    }

    info!("Whiteboard shut down cleanly");
    Ok(())
}

fn import_catalog(db: &db::Database, path: &Path) -> anyhow::Result<usize> {
    let players = import::load_players(path)
        .with_context(|| format!("failed to read players from {}", path.display()))?;
    let written = db.upsert_players(&players).context("failed to store players")?;
    info!("Imported {} players from {}", written, path.display());
    Ok(written)
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("whiteboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("whiteboard=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
