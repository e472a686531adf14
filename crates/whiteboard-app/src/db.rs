// SQLite persistence: the player catalog and saved whiteboards.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use whiteboard_core::document::BoardDocument;
use whiteboard_core::error::{CatalogError, StoreError};
use whiteboard_core::player::Player;
use whiteboard_core::{BoardStore, PlayerCatalog};

/// SQLite-backed catalog and board store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id        TEXT PRIMARY KEY,
                first     TEXT NOT NULL,
                last      TEXT NOT NULL,
                position  TEXT NOT NULL,
                school    TEXT NOT NULL,
                eligible  TEXT NOT NULL,
                slug      TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_players_eligible ON players(eligible);

            CREATE TABLE IF NOT EXISTS whiteboards (
                key        TEXT PRIMARY KEY,
                owner_id   TEXT NOT NULL,
                context    TEXT NOT NULL,
                document   TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert or replace players in a single transaction. Returns the number
    /// of rows written.
    pub fn upsert_players(&self, players: &[Player]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin import transaction")?;
        for p in players {
            tx.execute(
                "INSERT INTO players (id, first, last, position, school, eligible, slug)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    first    = excluded.first,
                    last     = excluded.last,
                    position = excluded.position,
                    school   = excluded.school,
                    eligible = excluded.eligible,
                    slug     = excluded.slug",
                params![p.id, p.first, p.last, p.position, p.school, p.eligible, p.slug],
            )
            .with_context(|| format!("failed to upsert player {}", p.id))?;
        }
        tx.commit().context("failed to commit player import")?;
        Ok(players.len())
    }

    /// Players eligible for `class`, ordered by id.
    pub fn load_players(&self, class: &str) -> Result<Vec<Player>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, first, last, position, school, eligible, slug
                 FROM players WHERE eligible = ?1 ORDER BY id",
            )
            .context("failed to prepare load_players query")?;

        let players = stmt
            .query_map(params![class], |row| {
                Ok(Player {
                    id: row.get(0)?,
                    first: row.get(1)?,
                    last: row.get(2)?,
                    position: row.get(3)?,
                    school: row.get(4)?,
                    eligible: row.get(5)?,
                    slug: row.get(6)?,
                })
            })
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;

        Ok(players)
    }

    pub fn player_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Whiteboards
    // ------------------------------------------------------------------

    /// Raw stored row for `key`.
    fn load_board_row(&self, key: &str) -> Result<Option<BoardRow>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT document, owner_id, context, updated_at FROM whiteboards WHERE key = ?1",
            params![key],
            |row| {
                Ok(BoardRow {
                    document: row.get(0)?,
                    owner_id: row.get(1)?,
                    context: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .optional()
        .context("failed to query whiteboard")
    }

    /// Write `doc` under `key`. The timestamp is generated by SQLite and
    /// returned.
    fn save_board_row(&self, key: &str, doc: &BoardDocument) -> Result<String> {
        let json = serde_json::to_string(doc).context("failed to serialize whiteboard")?;
        let conn = self.conn()?;
        conn.query_row(
            "INSERT INTO whiteboards (key, owner_id, context, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET
                owner_id   = excluded.owner_id,
                context    = excluded.context,
                document   = excluded.document,
                updated_at = excluded.updated_at
             RETURNING updated_at",
            params![key, doc.owner_id, doc.context, json],
            |row| row.get(0),
        )
        .context("failed to save whiteboard")
    }
}

/// One `whiteboards` row before decoding.
struct BoardRow {
    document: String,
    owner_id: String,
    context: String,
    updated_at: String,
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid stored timestamp {text:?}"))
}

#[async_trait]
impl PlayerCatalog for Database {
    async fn players_in_class(&self, class: &str) -> Result<Vec<Player>, CatalogError> {
        self.load_players(class)
            .map_err(|e| CatalogError::Unavailable(format!("{e:#}")))
    }
}

#[async_trait]
impl BoardStore for Database {
    async fn get(&self, key: &str) -> Result<Option<BoardDocument>, StoreError> {
        let read_err = |e: anyhow::Error| StoreError::Read {
            key: key.to_string(),
            message: format!("{e:#}"),
        };

        let Some(row) = self.load_board_row(key).map_err(read_err)? else {
            debug!("No whiteboard stored under {}", key);
            return Ok(None);
        };

        let mut doc: BoardDocument =
            serde_json::from_str(&row.document).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            })?;
        doc.fill_identity(&row.owner_id, &row.context);
        doc.updated_at = Some(parse_timestamp(&row.updated_at).map_err(read_err)?);
        Ok(Some(doc))
    }

    async fn put(&self, key: &str, doc: &BoardDocument) -> Result<DateTime<Utc>, StoreError> {
        let write_err = |e: anyhow::Error| StoreError::Write {
            key: key.to_string(),
            message: format!("{e:#}"),
        };
        let stamp = self.save_board_row(key, doc).map_err(write_err)?;
        parse_timestamp(&stamp).map_err(write_err)
    }
}
