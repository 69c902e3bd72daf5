use thiserror::Error;

use crate::entity::NoteId;

#[derive(Error, Debug)]
pub enum TabnotesError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Element not found: {0}")]
    MissingAnchor(&'static str),

    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("No note ids left to allocate")]
    IdsExhausted,

    #[error("This page is read-only")]
    ReadOnlyPage,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TabnotesError>;
