//! Session-scoped set of entities the client asked to follow.
//!
//! The client command handler replaces the whole set; the upstream read
//! loop filters every event against it. A [`tokio::sync::RwLock`] around a
//! plain `HashSet` gives readers either the old or the new set, never a mix.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entity_filter::{self, Decision};

/// Shared, cheaply cloneable handle to one session's interest set.
#[derive(Debug, Clone, Default)]
pub struct InterestSet {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl InterestSet {
    /// Creates an empty set (default-suffix filtering).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically swaps in a new selection and returns its size.
    ///
    /// Duplicates and empty identifiers collapse away.
    pub async fn replace<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let next: HashSet<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        let count = next.len();
        *self.inner.write().await = next;
        count
    }

    /// Runs the entity filter against the current selection.
    pub async fn decide(&self, entity_id: &str) -> Decision {
        let guard = self.inner.read().await;
        entity_filter::decide(entity_id, &guard)
    }

    /// Filters a batch under a single read lock.
    pub async fn retain<T, F>(&self, items: Vec<T>, mut entity_id: F) -> Vec<T>
    where
        F: FnMut(&T) -> &str,
    {
        let guard = self.inner.read().await;
        items
            .into_iter()
            .filter(|item| entity_filter::decide(entity_id(item), &guard).is_forward())
            .collect()
    }
}
