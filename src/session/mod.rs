//! A note page: startup reconciliation, debounced persistence and cross-tab sync.
//!
//! [`Session`] owns everything a page mutates ([`SessionState`]), the store
//! handle (absent when storage is unavailable) and a [`Renderer`]. Handlers
//! take `&mut self` and run to completion, so the caller's event loop is the
//! only scheduler.

mod debounce;
mod sync;

pub use debounce::Debouncer;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::WidgetConfig;
use crate::entity::{Note, NoteId, NoteKey};
use crate::error::{Result, TabnotesError};
use crate::render::{Renderer, TimestampDisplay};
use crate::storage::KeyValueStore;
use crate::timestamp::{self, LAST_SAVED_KEY};

const STORAGE_UNAVAILABLE: &str = "Local storage is not available; notes will not be saved";

/// Which page is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Create, edit and remove notes.
    Writer,
    /// Read-only view.
    Reader,
}

/// Mutable state of one page, initialized at startup and never torn down.
#[derive(Debug, Clone)]
pub struct SessionState {
    next_id: NoteId,
    unsaved: BTreeSet<NoteId>,
    notes: BTreeMap<NoteId, Note>,
    debouncer: Debouncer,
}

impl SessionState {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            next_id: NoteId(0),
            unsaved: BTreeSet::new(),
            notes: BTreeMap::new(),
            debouncer: Debouncer::new(config.save_interval()),
        }
    }

    /// Hand out the next id. Ids are never reused; the last id of the id
    /// space is never handed out so that every live id has a successor.
    pub fn allocate_id(&mut self) -> Result<NoteId> {
        let id = self.next_id;
        self.next_id = id.next().ok_or(TabnotesError::IdsExhausted)?;
        Ok(id)
    }

    /// Make sure ids allocated from now on are greater than `id`.
    pub fn observe_id(&mut self, id: NoteId) {
        match id.next() {
            Some(next) if next > self.next_id => self.next_id = next,
            Some(_) => {}
            None => warn!(id = %id, "note id has no successor"),
        }
    }

    pub fn next_id(&self) -> NoteId {
        self.next_id
    }

    pub fn unsaved(&self) -> &BTreeSet<NoteId> {
        &self.unsaved
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }
}

pub struct Session<S, R> {
    mode: PageMode,
    config: WidgetConfig,
    store: Option<S>,
    renderer: R,
    state: SessionState,
}

impl<S: KeyValueStore, R: Renderer> Session<S, R> {
    /// Load a page. `store` is `None` when storage could not be opened; the
    /// page then runs with every persistence step reduced to a logged no-op.
    pub fn start(mode: PageMode, store: Option<S>, renderer: R, config: WidgetConfig) -> Self {
        let state = SessionState::new(&config);
        let mut session = Self {
            mode,
            config,
            store,
            renderer,
            state,
        };

        if session.store.is_none() {
            warn!("{}", STORAGE_UNAVAILABLE);
        }

        match mode {
            PageMode::Writer => {
                session.load_editable();
                session.refresh_last_saved();
            }
            PageMode::Reader => {
                session.load_read_only();
                session.show_timestamp(TimestampDisplay::LastUpdated);
            }
        }
        session
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// When the pending flush is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.debouncer.deadline()
    }

    fn storage_key(&self, id: NoteId) -> String {
        NoteKey::format(&self.config.key_prefix, id)
    }

    fn require_writer(&self) -> Result<()> {
        match self.mode {
            PageMode::Writer => Ok(()),
            PageMode::Reader => Err(TabnotesError::ReadOnlyPage),
        }
    }

    /// Every `(id, text)` under a valid note key, in store enumeration order.
    fn scan_notes(&self) -> Vec<(NoteId, String)> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };
        let keys = match store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "failed to enumerate storage");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for key in keys {
            let id = match NoteKey::classify(&self.config.key_prefix, &key) {
                NoteKey::Note(id) => id,
                NoteKey::Malformed => {
                    warn!(key = %key, "skipping malformed note key");
                    continue;
                }
                NoteKey::Other => continue,
            };
            match store.get_item(&key) {
                Ok(Some(text)) => found.push((id, text)),
                Ok(None) => debug!(key = %key, "note key vanished during scan"),
                Err(e) => warn!(key = %key, error = %e, "failed to read note"),
            }
        }
        found
    }

    fn load_editable(&mut self) {
        for (id, text) in self.scan_notes() {
            self.state.observe_id(id);
            if let Err(e) = self.renderer.render_editable(id, &text) {
                error!(error = %e, "cannot display notes");
                return;
            }
            self.state.notes.insert(id, Note::new(id, text));
        }
        info!(count = self.state.notes.len(), "loaded notes for editing");
    }

    fn load_read_only(&mut self) {
        let mut notes = self.scan_notes();
        notes.sort_by_key(|(id, _)| *id);

        for (id, text) in &notes {
            self.state.observe_id(*id);
            if let Err(e) = self.renderer.render_read_only(*id, text) {
                error!(error = %e, "cannot display notes");
                return;
            }
        }
        info!(count = notes.len(), "loaded notes for reading");
    }

    /// Writer "add" control: a new empty note, or one pre-filled with `text`
    /// which then counts as an edit. Returns `None` when the note could not
    /// be displayed.
    pub fn add_note(&mut self, text: &str, now: Instant) -> Result<Option<NoteId>> {
        self.require_writer()?;

        let id = self.state.allocate_id()?;
        if let Err(e) = self.renderer.render_editable(id, text) {
            error!(error = %e, "cannot add note");
            return Ok(None);
        }
        self.state.notes.insert(id, Note::new(id, text));
        debug!(id = %id, "created note");

        if !text.is_empty() {
            self.mark_dirty(id, now);
        }
        Ok(Some(id))
    }

    /// Input on a note's text control.
    pub fn edit_note(&mut self, id: NoteId, text: &str, now: Instant) -> Result<()> {
        self.require_writer()?;

        let note = self
            .state
            .notes
            .get_mut(&id)
            .ok_or(TabnotesError::NoteNotFound(id))?;
        note.text = text.to_string();
        self.renderer.update_text(id, text);
        self.mark_dirty(id, now);
        Ok(())
    }

    fn mark_dirty(&mut self, id: NoteId, now: Instant) {
        self.state.unsaved.insert(id);
        self.state.debouncer.trigger(now);
    }

    /// Remove control: drops the persisted entry, the in-memory note and its
    /// fragment, then refreshes the last-saved display.
    pub fn remove_note(&mut self, id: NoteId) -> Result<()> {
        self.require_writer()?;

        if self.state.notes.remove(&id).is_none() {
            return Err(TabnotesError::NoteNotFound(id));
        }
        self.state.unsaved.remove(&id);

        let key = self.storage_key(id);
        match self.store.as_mut() {
            None => warn!("{}", STORAGE_UNAVAILABLE),
            Some(store) => match store.get_item(&key) {
                Ok(Some(_)) => match store.remove_item(&key) {
                    Ok(()) => info!(key = %key, "note removed from storage"),
                    Err(e) => warn!(key = %key, error = %e, "failed to remove note"),
                },
                Ok(None) => warn!(key = %key, "key not found in storage"),
                Err(e) => warn!(key = %key, error = %e, "failed to read note"),
            },
        }

        self.renderer.remove(id);
        self.refresh_last_saved();
        Ok(())
    }

    /// Flush if the quiet period has elapsed. Returns true when a flush ran.
    pub fn poll_timer(&mut self, now: Instant) -> bool {
        if self.state.debouncer.take_due(now) {
            self.flush();
            true
        } else {
            false
        }
    }

    /// Cancel the pending timer and flush immediately.
    pub fn flush_now(&mut self) -> usize {
        self.state.debouncer.cancel();
        self.flush()
    }

    /// Write every dirty note's live text under its key. Returns the number
    /// of notes written.
    pub fn flush(&mut self) -> usize {
        if self.state.unsaved.is_empty() {
            return 0;
        }
        let Some(store) = self.store.as_mut() else {
            warn!("{}", STORAGE_UNAVAILABLE);
            return 0;
        };

        let prefix = &self.config.key_prefix;
        let mut written = 0;
        let mut failed = BTreeSet::new();
        for &id in &self.state.unsaved {
            let Some(text) = self.renderer.editable_text(id) else {
                debug!(id = %id, "no editable control, skipping");
                continue;
            };
            let key = NoteKey::format(prefix, id);
            match store.set_item(&key, &text) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to save note");
                    failed.insert(id);
                }
            }
        }
        self.state.unsaved = failed;

        info!(written, "dirty notes saved to storage");
        self.refresh_last_saved();
        written
    }

    fn refresh_last_saved(&mut self) {
        let stamp = self.show_timestamp(TimestampDisplay::LastSaved);
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.set_item(LAST_SAVED_KEY, &stamp) {
                warn!(error = %e, "failed to store last-saved time");
            }
        }
    }

    fn show_timestamp(&mut self, display: TimestampDisplay) -> String {
        let stamp = timestamp::now_locale();
        if let Err(e) = self.renderer.update_timestamp(display, &stamp) {
            debug!(error = %e, "timestamp display skipped");
        }
        stamp
    }
}
