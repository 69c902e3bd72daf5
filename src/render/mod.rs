//! Presentation seam between a note session and whatever displays it.

mod board;

pub use board::{Board, Fragment, FragmentKind};

use crate::entity::NoteId;
use crate::error::Result;

/// Anchor ids of the two timestamp displays.
pub const LAST_SAVED_ANCHOR: &str = "last-saved-time";
pub const LAST_UPDATED_ANCHOR: &str = "last-updated-time";
pub const CONTAINER_ANCHOR: &str = "container";

/// Which timestamp display to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampDisplay {
    LastSaved,
    LastUpdated,
}

impl TimestampDisplay {
    pub fn anchor(self) -> &'static str {
        match self {
            TimestampDisplay::LastSaved => LAST_SAVED_ANCHOR,
            TimestampDisplay::LastUpdated => LAST_UPDATED_ANCHOR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimestampDisplay::LastSaved => "Last saved",
            TimestampDisplay::LastUpdated => "Last updated",
        }
    }
}

/// Capability interface for note fragments.
///
/// Methods that need an anchor element return
/// [`TabnotesError::MissingAnchor`](crate::TabnotesError::MissingAnchor) when it is absent.
pub trait Renderer {
    /// Append an editable fragment pre-filled with `text`.
    fn render_editable(&mut self, id: NoteId, text: &str) -> Result<()>;

    /// Show `text` read-only. An existing fragment for `id` is updated in
    /// place rather than duplicated.
    fn render_read_only(&mut self, id: NoteId, text: &str) -> Result<()>;

    /// Update the text of an existing fragment. Returns false if there is none.
    fn update_text(&mut self, id: NoteId, text: &str) -> bool;

    /// Current value of the editable control for `id`, if one is live.
    fn editable_text(&self, id: NoteId) -> Option<String>;

    /// Remove the fragment for `id`. Returns false if there was none.
    fn remove(&mut self, id: NoteId) -> bool;

    /// Remove every fragment.
    fn clear(&mut self);

    fn update_timestamp(&mut self, display: TimestampDisplay, text: &str) -> Result<()>;
}
