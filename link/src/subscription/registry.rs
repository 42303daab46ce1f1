//! Registry of running subscriptions.
//!
//! Maps a subscription id to the handle that stops its pump. The registry
//! holds no business data; snapshots for callers come from the shared
//! connection instead.

use dashmap::DashMap;
use log::debug;
use tokio_util::sync::CancellationToken;

/// Fire-and-forget hook run once when an entry is cancelled through the
/// registry.
pub type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

struct RegistryEntry {
    cancel: CancellationToken,
    release: Option<ReleaseHook>,
}

impl RegistryEntry {
    fn cancel(self) {
        self.cancel.cancel();
        if let Some(release) = self.release {
            release();
        }
    }
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription. An existing entry under the same id is
    /// cancelled first.
    pub fn add(&self, id: impl Into<String>, cancel: CancellationToken) {
        self.insert(id.into(), RegistryEntry { cancel, release: None });
    }

    pub fn add_with_release(&self, id: impl Into<String>, cancel: CancellationToken, release: ReleaseHook) {
        self.insert(
            id.into(),
            RegistryEntry {
                cancel,
                release: Some(release),
            },
        );
    }

    fn insert(&self, id: String, entry: RegistryEntry) {
        if let Some(previous) = self.entries.insert(id.clone(), entry) {
            debug!("[mythic-link] Replacing registry entry '{}'", id);
            previous.cancel();
        }
    }

    /// Remove an entry without cancelling it. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Cancel and remove an entry. Returns whether it existed.
    pub fn cancel(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, entry)) => {
                entry.cancel();
                true
            },
            None => false,
        }
    }

    /// Cancel and remove every entry. Returns how many were cancelled.
    ///
    /// Entries are removed before their handles run so no shard lock is
    /// held while cancelling.
    pub fn remove_all(&self) -> usize {
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                entry.cancel();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!("[mythic-link] Cancelled {} subscription(s)", cancelled);
        }
        cancelled
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
