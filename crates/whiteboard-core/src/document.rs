// Persisted form of a board: one JSON document per owner and draft class.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::board::{Board, Repairs};
use crate::container::SlotKey;
use crate::player::PlayerId;
use crate::position::{Position, Round};

/// Round label -> position code -> ordered player ids.
pub type StoredBoard = BTreeMap<String, BTreeMap<String, Vec<PlayerId>>>;

/// Storage key of the board owned by `owner_id` for `context`.
pub fn document_key(owner_id: &str, context: &str) -> String {
    format!("{owner_id}_{context}")
}

/// A saved whiteboard.
///
/// ```json
/// { "ownerId": "u1", "context": "2026",
///   "board": { "ROUND 1": { "QB": ["p1", "p2"], ... }, ... },
///   "updatedAt": "2026-04-01T12:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    /// Blank in documents written without it; see [`BoardDocument::fill_identity`].
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, deserialize_with = "lenient_board")]
    pub board: StoredBoard,
    /// Assigned by the store when the document is written.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BoardDocument {
    /// Serialize every slot of `board`, empty ones included.
    pub fn from_board(owner_id: &str, context: &str, board: &Board) -> Self {
        let mut stored: StoredBoard = BTreeMap::new();
        for (key, ids) in board.slots() {
            stored
                .entry(key.round.label().to_string())
                .or_default()
                .insert(key.position.code().to_string(), ids.to_vec());
        }
        BoardDocument {
            owner_id: owner_id.to_string(),
            context: context.to_string(),
            board: stored,
            updated_at: None,
        }
    }

    pub fn key(&self) -> String {
        document_key(&self.owner_id, &self.context)
    }

    /// Restore owner and context from the key the document was read under
    /// when the stored copy lacks them.
    pub fn fill_identity(&mut self, owner_id: &str, context: &str) {
        if self.owner_id.trim().is_empty() {
            warn!("stored board lacks an owner, using {}", owner_id);
            self.owner_id = owner_id.to_string();
        }
        if self.context.trim().is_empty() {
            warn!("stored board {} lacks a context, using {}", self.owner_id, context);
            self.context = context.to_string();
        }
    }

    /// Rebuild the board, repairing structure the current schema expects.
    ///
    /// Rounds or positions this version does not know are dropped. Missing
    /// slots come back empty and duplicate placements keep their first
    /// occurrence. Repairs are logged, never reported as errors.
    pub fn to_board(&self) -> (Board, Repairs) {
        let mut slots: BTreeMap<SlotKey, Vec<PlayerId>> = BTreeMap::new();

        for (round_label, columns) in &self.board {
            let Some(round) = Round::from_label(round_label) else {
                warn!(
                    "board {}: dropping unknown round '{}'",
                    self.key(),
                    round_label
                );
                continue;
            };
            for (code, ids) in columns {
                let Some(position) = Position::from_code(code) else {
                    warn!(
                        "board {}: dropping unknown position '{}' in {}",
                        self.key(),
                        code,
                        round_label
                    );
                    continue;
                };
                slots
                    .entry(SlotKey::new(round, position))
                    .or_default()
                    .extend(ids.iter().cloned());
            }
        }

        let (board, repairs) = Board::from_slots(slots);
        if repairs.missing_slots > 0 {
            warn!(
                "board {}: filled {} missing slots",
                self.key(),
                repairs.missing_slots
            );
        }
        if !repairs.duplicates_dropped.is_empty() {
            warn!(
                "board {}: dropped duplicate placements {:?}",
                self.key(),
                repairs.duplicates_dropped
            );
        }
        (board, repairs)
    }

    pub fn into_board(self) -> Board {
        self.to_board().0
    }
}

/// Accept any JSON shape for `board`, keeping only the string ids found in
/// `{round: {position: [..]}}` positions. Anything else reads as empty and
/// is later filled in by [`BoardDocument::to_board`].
fn lenient_board<'de, D>(deserializer: D) -> Result<StoredBoard, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let mut stored = StoredBoard::new();

    let Some(rounds) = value.as_object() else {
        return Ok(stored);
    };
    for (round, columns) in rounds {
        let Some(columns) = columns.as_object() else {
            continue;
        };
        let entry = stored.entry(round.clone()).or_default();
        for (position, ids) in columns {
            let ids: Vec<PlayerId> = ids
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            entry.insert(position.clone(), ids);
        }
    }
    Ok(stored)
}
