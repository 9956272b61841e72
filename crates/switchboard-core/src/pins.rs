//! Pinned conversations.
//!
//! Pinning is a presentation hint: pinned conversations sort ahead of the
//! rest of the roster. It carries no synchronization or notification
//! semantics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ConversationId;

/// Set of pinned conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSet {
    conversations: HashSet<ConversationId>,
}

impl PinSet {
    /// Toggle the pin flag for `conversation`. Returns the new state.
    pub fn toggle(&mut self, conversation: ConversationId) -> bool {
        if self.conversations.remove(&conversation) {
            false
        } else {
            self.conversations.insert(conversation);
            true
        }
    }

    /// Whether `conversation` is pinned.
    pub fn is_pinned(&self, conversation: &ConversationId) -> bool {
        self.conversations.contains(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_the_flag() {
        let mut pins = PinSet::default();
        let group = ConversationId::Group("g1".into());
        assert!(pins.toggle(group.clone()));
        assert!(pins.is_pinned(&group));
        assert!(!pins.toggle(group.clone()));
        assert!(!pins.is_pinned(&group));
    }

    #[test]
    fn pins_are_per_conversation() {
        let mut pins = PinSet::default();
        pins.toggle(ConversationId::Dm("u1".into()));
        assert!(pins.is_pinned(&ConversationId::Dm("u1".into())));
        assert!(!pins.is_pinned(&ConversationId::Dm("u2".into())));
    }
}
