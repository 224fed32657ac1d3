//! Batched, last-write-wins persistence.
//!
//! Cards stage full snapshots instead of writing through. A newer snapshot
//! for the same key replaces the pending one, so a flush can never write a
//! stale record over a newer one. Failed writes stay queued for the next
//! flush; in-memory state is never rolled back.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::collaborators::Notifier;
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
enum PendingWrite {
    Put(serde_json::Value),
    Remove,
}

/// Pending writes keyed by storage key.
#[derive(Debug, Default)]
pub struct WriteQueue {
    pending: IndexMap<String, PendingWrite>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.pending.insert(key.into(), PendingWrite::Put(value));
    }

    pub fn remove(&mut self, key: impl Into<String>) {
        self.pending.insert(key.into(), PendingWrite::Remove);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Queued outcome for `key`: `None` when nothing is queued,
    /// `Some(None)` when a removal is.
    pub fn peek(&self, key: &str) -> Option<Option<&serde_json::Value>> {
        match self.pending.get(key)? {
            PendingWrite::Put(value) => Some(Some(value)),
            PendingWrite::Remove => Some(None),
        }
    }

    /// Apply every pending write to `store`. Failures are re-queued.
    pub fn flush(&mut self, store: &dyn KeyValueStore) -> FlushReport {
        let mut report = FlushReport::default();
        for (key, write) in std::mem::take(&mut self.pending) {
            let result = match &write {
                PendingWrite::Put(value) => store.set(&key, value),
                PendingWrite::Remove => store.remove(&key),
            };
            match result {
                Ok(()) => report.written += 1,
                Err(error) => {
                    report.failed.push((key.clone(), error));
                    self.pending.insert(key, write);
                }
            }
        }
        report
    }
}

#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: usize,
    pub failed: Vec<(String, StorageError)>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Inner {
    store: Box<dyn KeyValueStore>,
    queue: WriteQueue,
}

/// Shared handle over the store, its write queue, and the notifier that
/// surfaces storage failures. Passed explicitly into every card and group.
pub struct Persistence {
    inner: Mutex<Inner>,
    notifier: Arc<dyn Notifier>,
}

impl Persistence {
    pub fn new(store: Box<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                store,
                queue: WriteQueue::new(),
            }),
            notifier,
        })
    }

    /// Queue a full snapshot of `value` under `key`.
    pub fn stage<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                self.report(key, &e.to_string());
                return;
            }
        };
        if let Some(mut inner) = self.lock() {
            debug!(key, "staged write");
            inner.queue.put(key, json);
        }
    }

    /// Queue deletion of `key`.
    pub fn stage_remove(&self, key: &str) {
        if let Some(mut inner) = self.lock() {
            debug!(key, "staged removal");
            inner.queue.remove(key);
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().map(|inner| inner.queue.len()).unwrap_or(0)
    }

    /// Write everything queued. Failures are logged and surfaced through
    /// the notifier; they stay queued.
    pub fn flush(&self) -> FlushReport {
        let report = match self.lock() {
            Some(mut inner) => {
                let Inner { store, queue } = &mut *inner;
                queue.flush(store.as_ref())
            }
            None => FlushReport::default(),
        };
        for (key, error) in &report.failed {
            self.report(key, &error.to_string());
        }
        report
    }

    /// Read `key`, preferring a queued write over the store.
    ///
    /// Missing keys, read failures, and undecodable values all yield `None`;
    /// the last two are also reported.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let lookup = {
            let inner = self.lock()?;
            let found = match inner.queue.peek(key) {
                Some(queued) => Ok(queued.cloned()),
                None => inner.store.get(key),
            };
            found
        };
        let value = match lookup {
            Ok(value) => value?,
            Err(e) => {
                self.report(key, &e.to_string());
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.report(key, &format!("unreadable record: {e}"));
                None
            }
        }
    }

    /// Drop everything, stored and queued. The queue is only discarded once
    /// the store has been wiped, so a failed clear loses no pending writes.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StorageError::Unavailable("persistence lock poisoned".into()))?;
        inner.store.clear()?;
        inner.queue.discard();
        Ok(())
    }

    fn lock(&self) -> Option<std::sync::MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("persistence lock poisoned; skipping storage access");
                None
            }
        }
    }

    fn report(&self, key: &str, message: &str) {
        warn!(key, error = message, "persistence failure");
        self.notifier
            .notify(&format!("Could not save changes ({key}): {message}"));
    }
}
