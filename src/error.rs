//! Error types shared by the scheduler and the progress store.

use thiserror::Error;

/// Caller contract violations. Everything else in the scheduler is total.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid grade: {0:?} (expected again, hard, good or easy)")]
    InvalidGrade(String),

    #[error("Invalid progress state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Deck not found: {0}")]
    DeckNotFound(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
