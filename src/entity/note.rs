// src/entity/note.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a note. Ids only ever grow within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl NoteId {
    /// The id after this one, or `None` at the end of the id space.
    pub fn next(self) -> Option<NoteId> {
        self.0.checked_add(1).map(NoteId)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(NoteId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
}

impl Note {
    pub fn new(id: NoteId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// How a store key relates to the note key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKey {
    /// `<prefix> <digits>`
    Note(NoteId),
    /// Starts with the prefix but does not carry a usable id.
    Malformed,
    /// Unrelated key, such as the last-saved timestamp.
    Other,
}

impl NoteKey {
    pub fn format(prefix: &str, id: NoteId) -> String {
        format!("{} {}", prefix, id)
    }

    /// Classify a key. Only an exact prefix, a single space and a plain
    /// decimal number below `u64::MAX` is accepted as a note key; the last
    /// value is excluded so every note id has a successor.
    pub fn classify(prefix: &str, key: &str) -> NoteKey {
        let Some(rest) = key.strip_prefix(prefix) else {
            return NoteKey::Other;
        };
        let Some(digits) = rest.strip_prefix(' ') else {
            return NoteKey::Malformed;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return NoteKey::Malformed;
        }
        match digits.parse::<NoteId>() {
            Ok(id) if id.next().is_some() => NoteKey::Note(id),
            _ => NoteKey::Malformed,
        }
    }
}
