// Error types for catalog access, persistence, and session operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("player catalog unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a [`crate::store::BoardStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read board {key}: {message}")]
    Read { key: String, message: String },

    #[error("failed to write board {key}: {message}")]
    Write { key: String, message: String },

    #[error("stored board {key} is not a valid document: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

/// Why a load could not complete. The session stays unusable until the
/// caller retries.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sign in to open a whiteboard")]
    Unauthenticated,

    #[error("wait for the save in progress to finish")]
    SaveInProgress,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a save was refused or failed. Unsaved changes are kept in every case.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("a save is already in progress")]
    InProgress,

    #[error("the board is not loaded")]
    NotReady,

    #[error("sign in to save your board")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}
