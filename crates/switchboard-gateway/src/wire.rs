//! Wire shapes for the remote conversation service.
//!
//! Every payload arrives inside an envelope with an out-of-band status code.
//! Attachment payloads are decoded leniently: unknown kinds map to
//! [`Attachment::Other`] instead of failing the whole message.

use serde::{Deserialize, Serialize};
use switchboard_core::{Attachment, Message};

/// Standard response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub response: Option<T>,
}

/// The authenticated user record.
#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    pub name: String,
}

/// Group listing record.
#[derive(Debug, Deserialize)]
pub(crate) struct WireGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub updated_at: u64,
}

/// DM thread listing record.
#[derive(Debug, Deserialize)]
pub(crate) struct WireChat {
    pub other_user: WireUser,
    #[serde(default)]
    pub updated_at: u64,
}

/// Attachment payload, tagged by kind.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireAttachment {
    Image {
        url: String,
    },
    Reply {
        reply_id: String,
    },
    #[serde(other)]
    Unknown,
}

impl From<WireAttachment> for Attachment {
    fn from(wire: WireAttachment) -> Self {
        match wire {
            WireAttachment::Image { url } => Self::Image { url },
            WireAttachment::Reply { reply_id } => Self::Reply { reply_id },
            WireAttachment::Unknown => Self::Other { kind: "unknown".into() },
        }
    }
}

impl From<Attachment> for WireAttachment {
    fn from(attachment: Attachment) -> Self {
        match attachment {
            Attachment::Image { url } => Self::Image { url },
            Attachment::Reply { reply_id } => Self::Reply { reply_id },
            Attachment::Other { .. } => Self::Unknown,
        }
    }
}

/// Message record as served by the remote service.
#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub id: String,
    pub created_at: u64,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
    #[serde(default)]
    pub favorited_by: Vec<String>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            id: wire.id,
            created_at: wire.created_at,
            author_id: wire.user_id,
            author_name: wire.name,
            group_id: wire.group_id,
            recipient_id: wire.recipient_id,
            text: wire.text,
            attachments: wire.attachments.into_iter().map(Attachment::from).collect(),
            liked_by: wire.favorited_by,
        }
    }
}

/// Group message page.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupMessagesPage {
    pub messages: Vec<WireMessage>,
}

/// DM message page.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectMessagesPage {
    pub direct_messages: Vec<WireMessage>,
}

/// Image upload result from the picture service.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResult {
    pub payload: UploadPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadPayload {
    pub url: String,
}

/// Outgoing group message body.
#[derive(Debug, Serialize)]
pub(crate) struct SendGroupBody {
    pub message: OutgoingMessage,
}

/// Outgoing DM body.
#[derive(Debug, Serialize)]
pub(crate) struct SendDirectBody {
    pub direct_message: OutgoingDirect,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingMessage {
    pub text: String,
    pub attachments: Vec<WireAttachment>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingDirect {
    pub recipient_id: String,
    pub text: String,
    pub attachments: Vec<WireAttachment>,
}

/// Membership add body.
#[derive(Debug, Serialize)]
pub(crate) struct AddMembersBody {
    pub members: Vec<NewMember>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewMember {
    pub user_id: String,
    pub nickname: String,
}
