//! Message and conversation identity types.
//!
//! A [`Message`] is an immutable record fetched from the remote conversation
//! service. The sole ordering key is `created_at` (1-second resolution, so
//! duplicates are expected) with `id` as the deterministic tie-breaker.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable, globally unique message identifier assigned by the remote service.
pub type MessageId = String;

/// Group identifier assigned by the remote service.
pub type GroupId = String;

/// User identifier assigned by the remote service.
pub type UserId = String;

/// Identity of a conversation as tracked by local state (read state, mutes,
/// alert words).
///
/// DM conversations are keyed by the counterpart's user id, not by the remote
/// service's chat id, so both directions of a thread share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationId {
    /// A group conversation.
    Group(GroupId),
    /// A direct-message thread, keyed by the counterpart user.
    Dm(UserId),
    /// A user-defined stream, keyed by its unique name.
    Stream(String),
}

impl ConversationId {
    /// Canonical string form used as a storage key (`g:`, `d:`, `s:` prefix).
    pub fn storage_key(&self) -> String {
        match self {
            Self::Group(id) => format!("g:{id}"),
            Self::Dm(id) => format!("d:{id}"),
            Self::Stream(name) => format!("s:{name}"),
        }
    }

    /// Parse the canonical string form produced by [`Self::storage_key`].
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (prefix, rest) = key.split_at_checked(2)?;
        match prefix {
            "g:" => Some(Self::Group(rest.to_string())),
            "d:" => Some(Self::Dm(rest.to_string())),
            "s:" => Some(Self::Stream(rest.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.storage_key())
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Self::from_storage_key(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("bad conversation key: {key}")))
    }
}

/// Typed attachment payload carried by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Hosted image.
    Image {
        /// Image URL on the remote service's CDN.
        url: String,
    },
    /// Reference to an earlier message this one replies to.
    Reply {
        /// Id of the message being replied to.
        reply_id: MessageId,
    },
    /// Any attachment kind this client does not interpret.
    Other {
        /// Remote service's attachment type tag.
        kind: String,
    },
}

/// Immutable message record from the remote conversation service.
///
/// Exactly one of `group_id` / `recipient_id` is set: group messages carry
/// the owning group, DMs carry the recipient of that copy of the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Globally unique, stable id.
    pub id: MessageId,
    /// Creation time, seconds since epoch (1-second resolution).
    pub created_at: u64,
    /// Author's user id.
    pub author_id: UserId,
    /// Author's display name at send time.
    pub author_name: String,
    /// Owning group. `None` for DMs.
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// DM recipient. `None` for group messages.
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    /// Message text. `None` for attachment-only messages.
    #[serde(default)]
    pub text: Option<String>,
    /// Typed attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Users who liked this message.
    #[serde(default)]
    pub liked_by: Vec<UserId>,
}

impl Message {
    /// Ordering key: `created_at` ascending, ties broken by id.
    pub fn sort_key(&self) -> (u64, &str) {
        (self.created_at, self.id.as_str())
    }

    /// The conversation this message belongs to, from the viewpoint of
    /// `current_user`.
    ///
    /// For DMs the counterpart is the author unless we authored it ourselves,
    /// in which case it is the recipient.
    pub fn conversation(&self, current_user: &UserId) -> Option<ConversationId> {
        if let Some(group_id) = &self.group_id {
            return Some(ConversationId::Group(group_id.clone()));
        }
        let recipient = self.recipient_id.as_ref()?;
        let counterpart =
            if &self.author_id == current_user { recipient } else { &self.author_id };
        Some(ConversationId::Dm(counterpart.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm(author: &str, recipient: &str) -> Message {
        Message {
            id: "1".into(),
            created_at: 100,
            author_id: author.into(),
            author_name: author.into(),
            group_id: None,
            recipient_id: Some(recipient.into()),
            text: Some("hi".into()),
            attachments: Vec::new(),
            liked_by: Vec::new(),
        }
    }

    #[test]
    fn dm_conversation_keys_on_counterpart() {
        let me: UserId = "me".into();
        let inbound = dm("them", "me");
        let outbound = dm("me", "them");

        assert_eq!(inbound.conversation(&me), Some(ConversationId::Dm("them".into())));
        assert_eq!(outbound.conversation(&me), Some(ConversationId::Dm("them".into())));
    }

    #[test]
    fn storage_key_round_trips() {
        for id in [
            ConversationId::Group("123".into()),
            ConversationId::Dm("u42".into()),
            ConversationId::Stream("night shift".into()),
        ] {
            assert_eq!(ConversationId::from_storage_key(&id.storage_key()), Some(id));
        }
        assert_eq!(ConversationId::from_storage_key("x:1"), None);
        assert_eq!(ConversationId::from_storage_key("g"), None);
    }
}
