//! Shared record of contract calls.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::actor::{ActorReference, ActorType};

/// One handled contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Actor that handled the call.
    pub reference: ActorReference,
    /// Method it handled.
    pub method: String,
    /// Caller, `None` for external calls.
    pub caller: Option<ActorReference>,
}

/// Append-only log of the calls contract actors handled, in handling order.
///
/// Cheap to clone; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    inner: Arc<JournalInner>,
}

#[derive(Debug, Default)]
struct JournalInner {
    entries: Mutex<Vec<JournalEntry>>,
    changed: Notify,
}

impl CallJournal {
    /// An empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, reference: &ActorReference, method: &str, caller: Option<&ActorReference>) {
        self.inner.entries.lock().push(JournalEntry {
            reference: reference.clone(),
            method: method.to_string(),
            caller: caller.cloned(),
        });
        self.inner.changed.notify_waiters();
    }

    /// Copy of all entries.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.entries.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Calls of `method` handled by actors of `actor_type`.
    pub fn count(&self, actor_type: &ActorType, method: &str) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|entry| &entry.reference.actor_type == actor_type && entry.method == method)
            .count()
    }

    /// Calls of `method` handled by `reference`.
    pub fn count_for(&self, reference: &ActorReference, method: &str) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|entry| &entry.reference == reference && entry.method == method)
            .count()
    }

    /// Wait until `predicate` holds over the entries, or `timeout` elapses.
    ///
    /// Returns whether the predicate held.
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&[JournalEntry]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let changed = self.inner.changed.notified();
            tokio::pin!(changed);
            // Register before checking so a record between check and await is not lost.
            changed.as_mut().enable();

            if predicate(&self.inner.entries.lock()) {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return predicate(&self.inner.entries.lock());
            }
        }
    }
}
