// Prospect records as read from the player catalog.

use serde::{Deserialize, Serialize};

use crate::position::{normalize_position, Position};

/// Stable catalog identifier of a player.
pub type PlayerId = String;

/// A draft prospect. The board only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub first: String,
    pub last: String,
    /// Raw position as listed by the catalog (e.g. "CB"), kept for display.
    pub position: String,
    pub school: String,
    /// Draft class year the player is eligible for (e.g. "2026").
    pub eligible: String,
    /// URL slug of the player's profile page.
    #[serde(default)]
    pub slug: String,
}

impl Player {
    /// Board column this player may be slotted into.
    pub fn normalized_position(&self) -> Option<Position> {
        normalize_position(&self.position)
    }

    /// Compact card label: first initial and last name ("C. Ward").
    pub fn display_name(&self) -> String {
        match self.first.trim().chars().next() {
            Some(initial) => format!("{initial}. {}", self.last.trim()),
            None => self.last.trim().to_string(),
        }
    }

    /// Sort key for bank columns.
    pub fn surname(&self) -> &str {
        self.last.trim()
    }
}
