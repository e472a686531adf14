// Player catalog access and the per-class snapshot the board works against.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::player::Player;
use crate::position::Position;

/// Read-only source of prospects, queried by draft class.
#[async_trait]
pub trait PlayerCatalog: Send + Sync {
    /// All players whose eligibility year equals `class`.
    async fn players_in_class(&self, class: &str) -> Result<Vec<Player>, CatalogError>;
}

/// Snapshot of one draft class, indexed by player id.
///
/// Fetched once per context switch; every board query and move consults
/// this snapshot rather than the live catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    players: Vec<Player>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a snapshot. Later duplicates of an id are ignored.
    pub fn new(players: Vec<Player>) -> Self {
        let mut kept: Vec<Player> = Vec::with_capacity(players.len());
        let mut index = HashMap::with_capacity(players.len());
        for player in players {
            if index.contains_key(&player.id) {
                continue;
            }
            index.insert(player.id.clone(), kept.len());
            kept.push(player);
        }
        Catalog {
            players: kept,
            index,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.index.get(id).and_then(|&i| self.players.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Normalized board column for a player id, if the player exists and
    /// has one.
    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.get(id).and_then(Player::normalized_position)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// In-memory catalog, used by tests and as a fixture source.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    players: Mutex<Vec<Player>>,
    fail_next: Mutex<bool>,
}

impl MemoryCatalog {
    pub fn new(players: Vec<Player>) -> Self {
        MemoryCatalog {
            players: Mutex::new(players),
            fail_next: Mutex::new(false),
        }
    }

    /// Make the next query fail once.
    pub fn fail_next_query(&self) {
        if let Ok(mut flag) = self.fail_next.lock() {
            *flag = true;
        }
    }
}

#[async_trait]
impl PlayerCatalog for MemoryCatalog {
    async fn players_in_class(&self, class: &str) -> Result<Vec<Player>, CatalogError> {
        if let Ok(mut flag) = self.fail_next.lock() {
            if std::mem::take(&mut *flag) {
                return Err(CatalogError::Unavailable("injected failure".into()));
            }
        }
        let players = self
            .players
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".into()))?;
        Ok(players
            .iter()
            .filter(|p| p.eligible == class)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, position: &str, eligible: &str) -> Player {
        Player {
            id: id.into(),
            first: "First".into(),
            last: format!("Last{id}"),
            position: position.into(),
            school: "School".into(),
            eligible: eligible.into(),
            slug: id.into(),
        }
    }

    #[test]
    fn snapshot_ignores_duplicate_ids() {
        let catalog = Catalog::new(vec![player("a", "QB", "2026"), player("a", "RB", "2026")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.position_of("a"), Some(Position::Quarterback));
    }

    #[test]
    fn position_of_unknown_id_is_none() {
        let catalog = Catalog::new(vec![player("a", "QB", "2026")]);
        assert_eq!(catalog.position_of("zzz"), None);
        assert!(!catalog.contains("zzz"));
    }

    #[tokio::test]
    async fn memory_catalog_filters_by_class() {
        let source = MemoryCatalog::new(vec![
            player("a", "QB", "2026"),
            player("b", "WR", "2027"),
            player("c", "CB", "2026"),
        ]);
        let players = source.players_in_class("2026").await.unwrap();
        let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn memory_catalog_injected_failure_fires_once() {
        let source = MemoryCatalog::new(vec![player("a", "QB", "2026")]);
        source.fail_next_query();
        assert!(source.players_in_class("2026").await.is_err());
        assert_eq!(source.players_in_class("2026").await.unwrap().len(), 1);
    }
}
