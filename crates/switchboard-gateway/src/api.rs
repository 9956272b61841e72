//! Typed gateway seam.
//!
//! [`ConversationApi`] is the only surface the sync engine talks to. The
//! production implementation is [`crate::HttpGateway`]; tests substitute
//! scripted fakes.

use async_trait::async_trait;
use switchboard_core::composer::{FetchOp, FetchTarget};
use switchboard_core::{Attachment, GatewayError, Message};

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable user id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Group listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Group id.
    pub id: String,
    /// Group name.
    pub name: String,
    /// Timestamp of the most recent activity, seconds.
    pub updated_at: u64,
}

/// DM thread listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectChat {
    /// Counterpart user id.
    pub other_user_id: String,
    /// Counterpart display name.
    pub other_user_name: String,
    /// Timestamp of the most recent activity, seconds.
    pub updated_at: u64,
}

/// Remote conversation service operations.
///
/// All calls carry the gateway's bearer credential. A 401-equivalent response
/// surfaces as [`GatewayError::Auth`] and is never retried; rate limits are
/// retried internally with bounded backoff before surfacing.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Fetch the authenticated user.
    async fn current_user(&self) -> Result<User, GatewayError>;

    /// List the user's groups.
    async fn list_groups(&self) -> Result<Vec<GroupInfo>, GatewayError>;

    /// List the user's DM threads.
    async fn list_direct_chats(&self) -> Result<Vec<DirectChat>, GatewayError>;

    /// Fetch up to `limit` messages from a group, newest first, optionally
    /// only those older than `before_id`.
    async fn group_messages(
        &self,
        group_id: &str,
        limit: u32,
        before_id: Option<&str>,
    ) -> Result<Vec<Message>, GatewayError>;

    /// Fetch up to `limit` messages from a DM thread, newest first,
    /// optionally only those older than `before_id`.
    async fn direct_messages(
        &self,
        other_user_id: &str,
        limit: u32,
        before_id: Option<&str>,
    ) -> Result<Vec<Message>, GatewayError>;

    /// Send a message to a group. Empty text with no attachments is rejected
    /// locally with [`GatewayError::Validation`].
    async fn send_group_message(
        &self,
        group_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), GatewayError>;

    /// Send a message to a DM counterpart. Same local validation as group
    /// sends.
    async fn send_direct_message(
        &self,
        other_user_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), GatewayError>;

    /// Like a message.
    async fn like(&self, conversation_id: &str, message_id: &str) -> Result<(), GatewayError>;

    /// Remove a like from a message.
    async fn unlike(&self, conversation_id: &str, message_id: &str) -> Result<(), GatewayError>;

    /// Delete a message from a group.
    async fn delete_message(&self, group_id: &str, message_id: &str)
        -> Result<(), GatewayError>;

    /// Upload an image; returns the hosted URL.
    async fn upload_image(&self, bytes: Vec<u8>) -> Result<String, GatewayError>;

    /// Add a member to a group under a nickname.
    async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), GatewayError>;

    /// Execute one composed fetch operation.
    async fn fetch(&self, op: &FetchOp) -> Result<Vec<Message>, GatewayError> {
        match &op.target {
            FetchTarget::Group(id) => {
                self.group_messages(id, op.page_size, op.before_id.as_deref()).await
            },
            FetchTarget::Dm(id) => {
                self.direct_messages(id, op.page_size, op.before_id.as_deref()).await
            },
        }
    }
}
