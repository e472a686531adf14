// Board persistence interface and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::document::BoardDocument;
use crate::error::StoreError;

/// Key-value storage for board documents, keyed by
/// [`crate::document::document_key`].
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Fetch a document. `Ok(None)` means no board has been saved yet.
    async fn get(&self, key: &str) -> Result<Option<BoardDocument>, StoreError>;

    /// Replace the document stored under `key`, returning the timestamp the
    /// store assigned to it. Last write wins.
    async fn put(&self, key: &str, doc: &BoardDocument) -> Result<DateTime<Utc>, StoreError>;
}

/// Process-local store. Supports one-shot failure injection for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, BoardDocument>>,
    fail_next_get: Mutex<bool>,
    fail_next_put: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_get(&self) {
        set_flag(&self.fail_next_get);
    }

    pub fn fail_next_put(&self) {
        set_flag(&self.fail_next_put);
    }

    /// Insert a document directly, bypassing `put`.
    pub fn seed(&self, key: &str, doc: BoardDocument) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(key.to_string(), doc);
        }
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn set_flag(flag: &Mutex<bool>) {
    if let Ok(mut f) = flag.lock() {
        *f = true;
    }
}

fn take_flag(flag: &Mutex<bool>) -> bool {
    flag.lock().map(|mut f| std::mem::take(&mut *f)).unwrap_or(false)
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<BoardDocument>, StoreError> {
        if take_flag(&self.fail_next_get) {
            return Err(StoreError::Read {
                key: key.to_string(),
                message: "network unreachable".into(),
            });
        }
        let docs = self.docs.lock().map_err(|_| StoreError::Read {
            key: key.to_string(),
            message: "store lock poisoned".into(),
        })?;
        Ok(docs.get(key).cloned())
    }

    async fn put(&self, key: &str, doc: &BoardDocument) -> Result<DateTime<Utc>, StoreError> {
        if take_flag(&self.fail_next_put) {
            return Err(StoreError::Write {
                key: key.to_string(),
                message: "network unreachable".into(),
            });
        }
        let mut docs = self.docs.lock().map_err(|_| StoreError::Write {
            key: key.to_string(),
            message: "store lock poisoned".into(),
        })?;
        let now = Utc::now();
        let mut stored = doc.clone();
        stored.updated_at = Some(now);
        docs.insert(key.to_string(), stored);
        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nobody_2026").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_assigns_timestamp_and_overwrites() {
        let store = MemoryStore::new();
        let doc = BoardDocument::from_board("u1", "2026", &Board::empty());

        let first = store.put("u1_2026", &doc).await.unwrap();
        let second = store.put("u1_2026", &doc).await.unwrap();
        assert!(second >= first);
        assert_eq!(store.len(), 1);

        let loaded = store.get("u1_2026").await.unwrap().unwrap();
        assert_eq!(loaded.updated_at, Some(second));
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let store = MemoryStore::new();
        let doc = BoardDocument::from_board("u1", "2026", &Board::empty());

        store.fail_next_put();
        assert!(matches!(
            store.put("u1_2026", &doc).await,
            Err(StoreError::Write { .. })
        ));
        assert!(store.is_empty());
        store.put("u1_2026", &doc).await.unwrap();

        store.fail_next_get();
        assert!(matches!(store.get("u1_2026").await, Err(StoreError::Read { .. })));
        assert!(store.get("u1_2026").await.unwrap().is_some());
    }
}
