//! View selectors.
//!
//! A [`ViewSelector`] identifies what a panel displays. It is an immutable
//! value: changing what a panel shows re-keys the panel with a new selector
//! rather than mutating the old one.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, GroupId, UserId};

/// Logical target a panel displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewSelector {
    /// Unified feed over the most recently active groups and approved DMs.
    AllFeed,
    /// All approved DM threads.
    AllDms,
    /// A single group.
    Group(GroupId),
    /// A single DM thread, keyed by counterpart user.
    Dm(UserId),
    /// One named stream of groups.
    Stream(String),
    /// Union of all monitored streams.
    UnifiedStreams,
}

impl ViewSelector {
    /// The concrete conversation this selector is bound to, if any.
    ///
    /// Composite views (`AllFeed`, `AllDms`, `UnifiedStreams`) have none.
    pub fn conversation(&self) -> Option<ConversationId> {
        match self {
            Self::Group(id) => Some(ConversationId::Group(id.clone())),
            Self::Dm(id) => Some(ConversationId::Dm(id.clone())),
            Self::Stream(name) => Some(ConversationId::Stream(name.clone())),
            Self::AllFeed | Self::AllDms | Self::UnifiedStreams => None,
        }
    }

    /// Whether this view supports backward history pagination.
    ///
    /// Only single-conversation views have a well-defined "oldest message"
    /// cursor; composites reload wholesale instead.
    pub fn supports_backfill(&self) -> bool {
        matches!(self, Self::Group(_) | Self::Dm(_))
    }

    /// The feed family this selector belongs to, for mute and sound choice.
    pub fn feed_kind(&self) -> FeedKind {
        match self {
            Self::AllFeed | Self::Group(_) => FeedKind::Groups,
            Self::AllDms | Self::Dm(_) => FeedKind::Dms,
            Self::Stream(_) | Self::UnifiedStreams => FeedKind::Streams,
        }
    }
}

/// Feed family used for feed-wide mute flags and default sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Group conversations and the unified group feed.
    Groups,
    /// Direct-message threads.
    Dms,
    /// User-defined stream aggregations.
    Streams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_conversations_backfill() {
        assert!(ViewSelector::Group("g".into()).supports_backfill());
        assert!(ViewSelector::Dm("u".into()).supports_backfill());
        assert!(!ViewSelector::AllFeed.supports_backfill());
        assert!(!ViewSelector::Stream("s".into()).supports_backfill());
        assert!(!ViewSelector::UnifiedStreams.supports_backfill());
    }

    #[test]
    fn composites_have_no_conversation() {
        assert_eq!(ViewSelector::AllFeed.conversation(), None);
        assert_eq!(
            ViewSelector::Dm("u1".into()).conversation(),
            Some(ConversationId::Dm("u1".into()))
        );
    }
}
