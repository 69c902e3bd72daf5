use std::fmt;

use serde::Serialize;

use super::{Renderer, TimestampDisplay, CONTAINER_ANCHOR};
use crate::entity::NoteId;
use crate::error::{Result, TabnotesError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Editable,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub id: NoteId,
    pub kind: FragmentKind,
    pub text: String,
}

/// In-memory fragment tree: a container of note fragments in append order
/// plus optional timestamp displays.
#[derive(Debug, Clone, Default)]
pub struct Board {
    fragments: Vec<Fragment>,
    has_container: bool,
    last_saved: Option<String>,
    last_updated: Option<String>,
}

impl Board {
    /// Writer page: container and a last-saved display.
    pub fn writer() -> Self {
        Self {
            has_container: true,
            last_saved: Some(String::new()),
            ..Self::default()
        }
    }

    /// Reader page: container and a last-updated display.
    pub fn reader() -> Self {
        Self {
            has_container: true,
            last_updated: Some(String::new()),
            ..Self::default()
        }
    }

    /// Page without any anchors.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, id: NoteId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id == id)
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<NoteId> {
        self.fragments.iter().map(|f| f.id).collect()
    }

    pub fn timestamp(&self, display: TimestampDisplay) -> Option<&str> {
        match display {
            TimestampDisplay::LastSaved => self.last_saved.as_deref(),
            TimestampDisplay::LastUpdated => self.last_updated.as_deref(),
        }
    }

    fn fragment_mut(&mut self, id: NoteId) -> Option<&mut Fragment> {
        self.fragments.iter_mut().find(|f| f.id == id)
    }

    fn container(&self) -> Result<()> {
        if self.has_container {
            Ok(())
        } else {
            Err(TabnotesError::MissingAnchor(CONTAINER_ANCHOR))
        }
    }
}

impl Renderer for Board {
    fn render_editable(&mut self, id: NoteId, text: &str) -> Result<()> {
        self.container()?;
        self.fragments.push(Fragment {
            id,
            kind: FragmentKind::Editable,
            text: text.to_string(),
        });
        Ok(())
    }

    fn render_read_only(&mut self, id: NoteId, text: &str) -> Result<()> {
        self.container()?;
        if self.update_text(id, text) {
            return Ok(());
        }
        self.fragments.push(Fragment {
            id,
            kind: FragmentKind::ReadOnly,
            text: text.to_string(),
        });
        Ok(())
    }

    fn update_text(&mut self, id: NoteId, text: &str) -> bool {
        match self.fragment_mut(id) {
            Some(fragment) => {
                fragment.text = text.to_string();
                true
            }
            None => false,
        }
    }

    fn editable_text(&self, id: NoteId) -> Option<String> {
        self.fragment(id)
            .filter(|f| f.kind == FragmentKind::Editable)
            .map(|f| f.text.clone())
    }

    fn remove(&mut self, id: NoteId) -> bool {
        let before = self.fragments.len();
        self.fragments.retain(|f| f.id != id);
        self.fragments.len() != before
    }

    fn clear(&mut self) {
        self.fragments.clear();
    }

    fn update_timestamp(&mut self, display: TimestampDisplay, text: &str) -> Result<()> {
        let slot = match display {
            TimestampDisplay::LastSaved => &mut self.last_saved,
            TimestampDisplay::LastUpdated => &mut self.last_updated,
        };
        match slot {
            Some(current) => {
                *current = format!("{}: {}", display.label(), text);
                Ok(())
            }
            None => Err(TabnotesError::MissingAnchor(display.anchor())),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for display in [TimestampDisplay::LastSaved, TimestampDisplay::LastUpdated] {
            if let Some(stamp) = self.timestamp(display).filter(|s| !s.is_empty()) {
                writeln!(f, "{}", stamp)?;
            }
        }
        if self.fragments.is_empty() {
            return writeln!(f, "(no notes)");
        }
        for fragment in &self.fragments {
            let marker = match fragment.kind {
                FragmentKind::Editable => "edit",
                FragmentKind::ReadOnly => "read",
            };
            writeln!(f, "[{}] ({}) {}", fragment.id, marker, fragment.text)?;
        }
        Ok(())
    }
}
