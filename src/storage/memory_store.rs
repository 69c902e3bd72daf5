use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use super::{KeyValueStore, StorageEvent};
use crate::error::{Result, TabnotesError};

#[derive(Default)]
struct OriginInner {
    /// Entries in insertion order; this is the enumeration order.
    items: Vec<(String, String)>,
    /// Pending notifications per open handle.
    queues: BTreeMap<usize, VecDeque<StorageEvent>>,
    next_tab: usize,
    available: bool,
}

impl OriginInner {
    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|(k, _)| k == key)
    }

    fn broadcast(&mut self, from: usize, event: StorageEvent) {
        for (tab, queue) in self.queues.iter_mut() {
            if *tab != from {
                queue.push_back(event.clone());
            }
        }
    }
}

/// In-process origin shared by any number of [`MemoryStore`] handles.
///
/// Single-threaded: handles share the origin through `Rc<RefCell<_>>`.
#[derive(Clone)]
pub struct MemoryOrigin {
    inner: Rc<RefCell<OriginInner>>,
}

impl Default for MemoryOrigin {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(OriginInner {
                available: true,
                ..OriginInner::default()
            })),
        }
    }

    /// Open a new handle ("tab") on this origin.
    pub fn open_tab(&self) -> MemoryStore {
        let mut inner = self.inner.borrow_mut();
        let tab = inner.next_tab;
        inner.next_tab += 1;
        inner.queues.insert(tab, VecDeque::new());
        MemoryStore {
            origin: self.clone(),
            tab,
        }
    }

    /// Make every subsequent operation fail, as a quota or I/O failure would.
    pub fn set_available(&self, available: bool) {
        self.inner.borrow_mut().available = available;
    }

    /// Snapshot of the stored entries in enumeration order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.inner.borrow().items.clone()
    }
}

/// Handle on a [`MemoryOrigin`].
pub struct MemoryStore {
    origin: MemoryOrigin,
    tab: usize,
}

impl MemoryStore {
    fn check(&self) -> Result<()> {
        if self.origin.inner.borrow().available {
            Ok(())
        } else {
            Err(TabnotesError::Storage("memory origin unavailable".to_string()))
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.origin.inner.borrow_mut().queues.remove(&self.tab);
    }
}

impl KeyValueStore for MemoryStore {
    fn len(&self) -> Result<usize> {
        self.check()?;
        Ok(self.origin.inner.borrow().items.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        self.check()?;
        Ok(self
            .origin
            .inner
            .borrow()
            .items
            .get(index)
            .map(|(k, _)| k.clone()))
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        let inner = self.origin.inner.borrow();
        Ok(inner.position(key).map(|i| inner.items[i].1.clone()))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let mut inner = self.origin.inner.borrow_mut();
        let old_value = match inner.position(key) {
            Some(i) => {
                if inner.items[i].1 == value {
                    return Ok(());
                }
                Some(std::mem::replace(&mut inner.items[i].1, value.to_string()))
            }
            None => {
                inner.items.push((key.to_string(), value.to_string()));
                None
            }
        };
        inner.broadcast(self.tab, StorageEvent::set(key, old_value, value));
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.check()?;
        let mut inner = self.origin.inner.borrow_mut();
        if let Some(i) = inner.position(key) {
            let (_, old_value) = inner.items.remove(i);
            inner.broadcast(self.tab, StorageEvent::removed(key, Some(old_value)));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.check()?;
        let mut inner = self.origin.inner.borrow_mut();
        if !inner.items.is_empty() {
            inner.items.clear();
            inner.broadcast(self.tab, StorageEvent::cleared());
        }
        Ok(())
    }

    fn poll_changes(&mut self) -> Result<Vec<StorageEvent>> {
        self.check()?;
        let mut inner = self.origin.inner.borrow_mut();
        Ok(inner
            .queues
            .get_mut(&self.tab)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default())
    }
}
