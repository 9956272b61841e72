//! HTTP implementation of the gateway.
//!
//! All requests run through the shared [`Throttle`] and a bounded
//! retry-on-rate-limit loop. Authentication failures are surfaced
//! immediately so the caller can force re-login; they are never retried.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use switchboard_core::{Attachment, GatewayError, Message};
use tokio::time::Duration;

use crate::api::{ConversationApi, DirectChat, GroupInfo, User};
use crate::throttle::Throttle;
use crate::wire::{
    AddMembersBody, DirectMessagesPage, Envelope, GroupMessagesPage, NewMember, OutgoingDirect,
    OutgoingMessage, SendDirectBody, SendGroupBody, UploadResult, WireAttachment, WireChat,
    WireGroup, WireUser,
};

/// Default base URL of the conversation service API.
pub const DEFAULT_BASE_URL: &str = "https://api.groupme.com/v3";

/// Base URL of the picture upload service.
const UPLOAD_BASE_URL: &str = "https://image.groupme.com";

/// Page size requested for roster listings.
const ROSTER_PAGE: u32 = 100;

/// Backoff delays applied to rate-limited requests before giving up.
const RATE_LIMIT_BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

/// Credential header understood by the remote service.
const TOKEN_HEADER: &str = "X-Access-Token";

/// Throttled, retrying HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    upload_url: String,
    token: String,
    throttle: Throttle,
}

impl HttpGateway {
    /// Create a gateway against the default service endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL, UPLOAD_BASE_URL)
    }

    /// Create a gateway against explicit endpoints (tests, staging).
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            throttle: Throttle::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request through the throttle, retrying rate limits with
    /// bounded backoff.
    async fn send<F>(&self, build: F) -> Result<Response, GatewayError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            let permit = self.throttle.acquire().await;
            let sent = build(&self.client).header(TOKEN_HEADER, &self.token).send().await;
            drop(permit);

            let response = sent.map_err(|e| GatewayError::Http(e.to_string()))?;
            match response.status() {
                StatusCode::UNAUTHORIZED => return Err(GatewayError::Auth),
                StatusCode::TOO_MANY_REQUESTS => {
                    let Some(delay) = RATE_LIMIT_BACKOFF.get(attempt as usize) else {
                        return Err(GatewayError::RateLimited { attempts: attempt + 1 });
                    };
                    tracing::warn!(attempt, ?delay, "rate limited, backing off");
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                },
                status if !status.is_success() && status != StatusCode::NOT_MODIFIED => {
                    return Err(GatewayError::Http(format!("status {status}")));
                },
                _ => return Ok(response),
            }
        }
    }

    /// Decode an enveloped payload, treating 304 as "no content".
    async fn decode<T>(response: Response) -> Result<Option<T>, GatewayError>
    where
        T: serde::de::DeserializeOwned,
    {
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        let envelope: Envelope<T> =
            response.json().await.map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(envelope.response)
    }

    fn validate_outgoing(text: &str, attachments: &[Attachment]) -> Result<(), GatewayError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(GatewayError::Validation("refusing to send an empty message".into()));
        }
        Ok(())
    }

    fn page_query(limit: u32, before_id: Option<&str>) -> Vec<(String, String)> {
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(before) = before_id {
            query.push(("before_id".to_string(), before.to_string()));
        }
        query
    }
}

#[async_trait]
impl ConversationApi for HttpGateway {
    async fn current_user(&self) -> Result<User, GatewayError> {
        let url = self.url("/users/me");
        let response = self.send(|c| c.get(&url)).await?;
        let user: WireUser = Self::decode(response)
            .await?
            .ok_or_else(|| GatewayError::Decode("missing user payload".into()))?;
        Ok(User { id: user.id, name: user.name })
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>, GatewayError> {
        let url = self.url("/groups");
        let response =
            self.send(|c| c.get(&url).query(&[("per_page", ROSTER_PAGE)])).await?;
        let groups: Vec<WireGroup> = Self::decode(response).await?.unwrap_or_default();
        Ok(groups
            .into_iter()
            .map(|g| GroupInfo { id: g.id, name: g.name, updated_at: g.updated_at })
            .collect())
    }

    async fn list_direct_chats(&self) -> Result<Vec<DirectChat>, GatewayError> {
        let url = self.url("/chats");
        let response =
            self.send(|c| c.get(&url).query(&[("per_page", ROSTER_PAGE)])).await?;
        let chats: Vec<WireChat> = Self::decode(response).await?.unwrap_or_default();
        Ok(chats
            .into_iter()
            .map(|c| DirectChat {
                other_user_id: c.other_user.id,
                other_user_name: c.other_user.name,
                updated_at: c.updated_at,
            })
            .collect())
    }

    async fn group_messages(
        &self,
        group_id: &str,
        limit: u32,
        before_id: Option<&str>,
    ) -> Result<Vec<Message>, GatewayError> {
        let url = self.url(&format!("/groups/{group_id}/messages"));
        let query = Self::page_query(limit, before_id);
        let response = self.send(|c| c.get(&url).query(&query)).await?;
        let page: Option<GroupMessagesPage> = Self::decode(response).await?;
        Ok(page.map(|p| p.messages.into_iter().map(Message::from).collect()).unwrap_or_default())
    }

    async fn direct_messages(
        &self,
        other_user_id: &str,
        limit: u32,
        before_id: Option<&str>,
    ) -> Result<Vec<Message>, GatewayError> {
        let url = self.url("/direct_messages");
        let mut query = Self::page_query(limit, before_id);
        query.push(("other_user_id".to_string(), other_user_id.to_string()));
        let response = self.send(|c| c.get(&url).query(&query)).await?;
        let page: Option<DirectMessagesPage> = Self::decode(response).await?;
        Ok(page
            .map(|p| p.direct_messages.into_iter().map(Message::from).collect())
            .unwrap_or_default())
    }

    async fn send_group_message(
        &self,
        group_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), GatewayError> {
        Self::validate_outgoing(text, &attachments)?;
        let url = self.url(&format!("/groups/{group_id}/messages"));
        let body = SendGroupBody {
            message: OutgoingMessage {
                text: text.to_string(),
                attachments: attachments.into_iter().map(WireAttachment::from).collect(),
            },
        };
        self.send(|c| c.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn send_direct_message(
        &self,
        other_user_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), GatewayError> {
        Self::validate_outgoing(text, &attachments)?;
        let url = self.url("/direct_messages");
        let body = SendDirectBody {
            direct_message: OutgoingDirect {
                recipient_id: other_user_id.to_string(),
                text: text.to_string(),
                attachments: attachments.into_iter().map(WireAttachment::from).collect(),
            },
        };
        self.send(|c| c.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn like(&self, conversation_id: &str, message_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&format!("/messages/{conversation_id}/{message_id}/like"));
        self.send(|c| c.post(&url)).await?;
        Ok(())
    }

    async fn unlike(&self, conversation_id: &str, message_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&format!("/messages/{conversation_id}/{message_id}/unlike"));
        self.send(|c| c.post(&url)).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        group_id: &str,
        message_id: &str,
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/conversations/{group_id}/messages/{message_id}"));
        self.send(|c| c.delete(&url)).await?;
        Ok(())
    }

    async fn upload_image(&self, bytes: Vec<u8>) -> Result<String, GatewayError> {
        let url = format!("{}/pictures", self.upload_url);
        let response = self
            .send(move |c| {
                c.post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
                    .body(bytes.clone())
            })
            .await?;
        let result: UploadResult =
            response.json().await.map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(result.payload.url)
    }

    async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/groups/{group_id}/members/add"));
        let body = AddMembersBody {
            members: vec![NewMember {
                user_id: user_id.to_string(),
                nickname: nickname.to_string(),
            }],
        };
        self.send(|c| c.post(&url).json(&body)).await?;
        Ok(())
    }
}
