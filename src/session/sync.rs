use tracing::{debug, info, warn};

use super::Session;
use crate::entity::NoteKey;
use crate::render::{Renderer, TimestampDisplay};
use crate::storage::{KeyValueStore, StorageEvent};

impl<S: KeyValueStore, R: Renderer> Session<S, R> {
    /// Drain pending notifications from other tabs and apply them. Returns
    /// the number of notifications that touched notes.
    pub fn pump_storage_events(&mut self) -> usize {
        let Some(store) = self.store.as_mut() else {
            return 0;
        };
        let events = match store.poll_changes() {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "failed to read storage changes");
                return 0;
            }
        };
        events
            .into_iter()
            .filter(|event| self.handle_storage_event(event))
            .count()
    }

    /// Apply one change made by another tab. Returns true when it concerned
    /// a note.
    pub fn handle_storage_event(&mut self, event: &StorageEvent) -> bool {
        let Some(key) = event.key.as_deref() else {
            info!("storage cleared in another tab");
            self.renderer.clear();
            self.state.notes.clear();
            self.state.unsaved.clear();
            self.show_timestamp(TimestampDisplay::LastUpdated);
            return true;
        };

        let id = match NoteKey::classify(&self.config.key_prefix, key) {
            NoteKey::Note(id) => id,
            NoteKey::Malformed => {
                warn!(key = %key, "ignoring change to malformed note key");
                return false;
            }
            NoteKey::Other => return false,
        };
        info!(key = %key, "note updated from another tab");

        match event.new_value.as_deref() {
            None => {
                if !self.renderer.remove(id) {
                    debug!(id = %id, "removed note was not displayed");
                }
                self.state.notes.remove(&id);
                self.state.unsaved.remove(&id);
            }
            Some(text) => {
                if let Some(note) = self.state.notes.get_mut(&id) {
                    note.text = text.to_string();
                }
                if !self.renderer.update_text(id, text) {
                    self.state.observe_id(id);
                    if let Err(e) = self.renderer.render_read_only(id, text) {
                        warn!(error = %e, "cannot display note from another tab");
                    }
                }
            }
        }

        self.show_timestamp(TimestampDisplay::LastUpdated);
        true
    }
}
