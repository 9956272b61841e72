//! Bounded per-panel dedup memory.
//!
//! Each panel tracks the message ids it has already rendered or counted so a
//! poll response can be diffed into "new arrivals" versus "already seen".
//! The set is bounded: long-lived panels prune their oldest entries instead
//! of growing for an entire shift. The cap is far larger than any poll page,
//! so a pruned id has long scrolled out of the overlap window.

use std::collections::{HashSet, VecDeque};

use crate::MessageId;

/// Default retention cap per panel.
pub const DEFAULT_CAP: usize = 4096;

/// Insertion-ordered set of message ids with bounded retention.
#[derive(Debug, Clone)]
pub struct KnownIds {
    set: HashSet<MessageId>,
    order: VecDeque<MessageId>,
    cap: usize,
}

impl Default for KnownIds {
    fn default() -> Self {
        Self::new()
    }
}

impl KnownIds {
    /// Create an empty set with the default cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_CAP)
    }

    /// Create an empty set with an explicit cap (minimum 1).
    pub fn with_cap(cap: usize) -> Self {
        Self { set: HashSet::new(), order: VecDeque::new(), cap: cap.max(1) }
    }

    /// Insert an id. Returns `true` if it was not previously known.
    ///
    /// On overflow the oldest entries are pruned until the cap holds.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if !self.set.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }

    /// Insert every id from `ids`.
    pub fn extend<I: IntoIterator<Item = MessageId>>(&mut self, ids: I) {
        for id in ids {
            self.insert(id);
        }
    }

    /// Whether `id` is currently known.
    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    /// Drop all entries. Used when a panel is re-keyed to a new selector.
    pub fn clear(&mut self) {
        self.set.clear();
        self.order.clear();
    }

    /// Number of retained ids.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut ids = KnownIds::new();
        assert!(ids.insert("a".into()));
        assert!(!ids.insert("a".into()));
        assert!(ids.contains("a"));
    }

    #[test]
    fn overflow_prunes_oldest_first() {
        let mut ids = KnownIds::with_cap(3);
        for id in ["a", "b", "c", "d"] {
            ids.insert(id.into());
        }
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains("a"));
        assert!(ids.contains("b"));
        assert!(ids.contains("d"));
    }

    #[test]
    fn duplicate_insert_does_not_grow_order() {
        let mut ids = KnownIds::with_cap(2);
        ids.insert("a".into());
        ids.insert("a".into());
        ids.insert("b".into());
        // "a" must survive: only two distinct ids were ever inserted.
        assert!(ids.contains("a"));
        assert!(ids.contains("b"));
    }

    #[test]
    fn clear_empties_everything() {
        let mut ids = KnownIds::new();
        ids.extend(["a".to_string(), "b".to_string()]);
        ids.clear();
        assert!(ids.is_empty());
        assert!(!ids.contains("a"));
    }

    mod properties {
        use proptest::prelude::*;

        use crate::KnownIds;

        proptest! {
            #[test]
            fn prop_len_never_exceeds_cap(
                ids in prop::collection::vec("[a-d]{1,3}", 0..200),
                cap in 1usize..16,
            ) {
                let mut known = KnownIds::with_cap(cap);
                for id in ids {
                    known.insert(id);
                }
                prop_assert!(known.len() <= cap);
            }

            #[test]
            fn prop_most_recent_insert_always_retained(
                ids in prop::collection::vec("[a-d]{1,3}", 1..100),
                cap in 1usize..8,
            ) {
                let mut known = KnownIds::with_cap(cap);
                for id in &ids {
                    known.insert(id.clone());
                }
                prop_assert!(known.contains(ids.last().map(String::as_str).unwrap_or("")));
            }
        }
    }
}
