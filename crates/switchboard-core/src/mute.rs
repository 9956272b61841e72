//! Mute flags.
//!
//! Muting is settable at three independent granularities: one conversation,
//! an entire feed family, or globally. A conversation is effectively muted if
//! any applicable flag is set. Mute affects notification only, never message
//! visibility.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{ConversationId, FeedKind};

/// Three-granularity mute state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteState {
    /// Global kill-switch.
    pub global: bool,
    /// Muted feed families.
    pub feeds: HashSet<FeedKind>,
    /// Individually muted conversations.
    pub conversations: HashSet<ConversationId>,
}

impl MuteState {
    /// Whether notifications for `conversation` (in feed family `kind`) are
    /// suppressed.
    pub fn is_effectively_muted(&self, conversation: &ConversationId, kind: FeedKind) -> bool {
        self.global || self.feeds.contains(&kind) || self.conversations.contains(conversation)
    }

    /// Toggle the mute flag for a single conversation. Returns the new state.
    pub fn toggle_conversation(&mut self, conversation: ConversationId) -> bool {
        if self.conversations.remove(&conversation) {
            false
        } else {
            self.conversations.insert(conversation);
            true
        }
    }

    /// Toggle the mute flag for a feed family. Returns the new state.
    pub fn toggle_feed(&mut self, kind: FeedKind) -> bool {
        if self.feeds.remove(&kind) {
            false
        } else {
            self.feeds.insert(kind);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str) -> ConversationId {
        ConversationId::Group(id.into())
    }

    #[test]
    fn global_mute_overrides_everything() {
        let mute = MuteState { global: true, ..MuteState::default() };
        assert!(mute.is_effectively_muted(&group("g1"), FeedKind::Groups));
        assert!(mute.is_effectively_muted(&ConversationId::Dm("u".into()), FeedKind::Dms));
    }

    #[test]
    fn conversation_mute_is_scoped() {
        let mut mute = MuteState::default();
        assert!(mute.toggle_conversation(group("g1")));
        assert!(mute.is_effectively_muted(&group("g1"), FeedKind::Groups));
        assert!(!mute.is_effectively_muted(&group("g2"), FeedKind::Groups));
    }

    #[test]
    fn feed_mute_covers_all_conversations_in_family() {
        let mut mute = MuteState::default();
        mute.toggle_feed(FeedKind::Dms);
        assert!(mute.is_effectively_muted(&ConversationId::Dm("a".into()), FeedKind::Dms));
        assert!(!mute.is_effectively_muted(&group("g1"), FeedKind::Groups));
    }
}
