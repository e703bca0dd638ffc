//! Remote service contracts the thread list and history build on.
//!
//! Implemented over HTTP by [`crate::endpoint`] and in memory by
//! [`crate::local::LocalBackend`].

use crate::codec::StoredMessage;
use crate::common::ContentPart;
use crate::common::MessageStream;
use crate::common::Role;
use crate::common::ThreadMessage;
use crate::error::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateThreadRequest {
    pub last_message_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateThreadResponse {
    pub thread_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateThreadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteThread {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateMessageRequest {
    pub parent_id: Option<String>,
    pub format: String,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub message_id: String,
}

/// Message shape accepted by the run endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl From<&ThreadMessage> for CoreMessage {
    fn from(message: &ThreadMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStreamRequest {
    pub thread_id: String,
    pub assistant_id: String,
    pub messages: Vec<CoreMessage>,
}

#[async_trait]
pub trait ThreadsApi: Send + Sync {
    async fn create(&self, request: CreateThreadRequest) -> Result<CreateThreadResponse>;
    async fn update(&self, thread_id: &str, request: UpdateThreadRequest) -> Result<()>;
    async fn delete(&self, thread_id: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<RemoteThread>>;
}

#[async_trait]
pub trait MessagesApi: Send + Sync {
    async fn create(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResponse>;

    /// Newest message first.
    async fn list(&self, thread_id: &str) -> Result<Vec<StoredMessage>>;
}

#[async_trait]
pub trait RunsApi: Send + Sync {
    async fn stream(
        &self,
        request: RunStreamRequest,
        cancel: CancellationToken,
    ) -> Result<MessageStream>;
}

#[async_trait]
pub trait LoadApi: Send + Sync {
    /// Sends one user message for `chat_id` and streams the reply.
    async fn load_chat_message(
        &self,
        chat_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageStream>;
}
