use crate::error::ApiError;
use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub content: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub data: Value,
}

/// One decoded event from the service's event stream.
///
/// On the wire this is `{"type": "text" | "metric", "message": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum RemoteMessage {
    Text(TextPayload),
    Metric(MetricPayload),
}

impl<'de> Deserialize<'de> for RemoteMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "lowercase")]
        enum Kind {
            Text,
            Metric,
        }

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "type")]
            kind: Kind,
            #[serde(alias = "payload")]
            message: Value,
        }

        let wire = Wire::deserialize(deserializer)?;
        let decoded = match wire.kind {
            Kind::Text => serde_json::from_value(wire.message).map(RemoteMessage::Text),
            Kind::Metric => serde_json::from_value(wire.message).map(RemoteMessage::Metric),
        };
        decoded.map_err(serde::de::Error::custom)
    }
}

impl RemoteMessage {
    pub fn role(&self) -> Role {
        match self {
            RemoteMessage::Text(text) => text.role,
            RemoteMessage::Metric(_) => Role::Assistant,
        }
    }

    /// Converts the event into the message shape the UI keeps in history.
    ///
    /// Metric payloads are rendered as their JSON text with an empty custom
    /// metadata map so the UI can pick them out.
    pub fn into_thread_message(self, id: impl Into<String>) -> ThreadMessage {
        let role = self.role();
        match self {
            RemoteMessage::Text(TextPayload { content, .. }) => ThreadMessage {
                id: id.into(),
                role,
                content: vec![ContentPart::Text { text: content }],
                metadata: None,
            },
            RemoteMessage::Metric(metric) => ThreadMessage {
                id: id.into(),
                role,
                content: vec![ContentPart::Text {
                    text: serde_json::to_string(&metric).unwrap_or_default(),
                }],
                metadata: Some(MessageMetadata::default()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub custom: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ThreadMessage {
    pub fn text(id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: vec![ContentPart::Text { text: text.into() }],
            metadata: None,
        }
    }

    /// Concatenation of every text part.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// A message created locally before the service has confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMessageRecord {
    pub local_id: String,
    pub parent_local_id: Option<String>,
    pub message: ThreadMessage,
}

impl LocalMessageRecord {
    pub fn new(parent_local_id: Option<String>, message: ThreadMessage) -> Self {
        Self {
            local_id: message.id.clone(),
            parent_local_id,
            message,
        }
    }
}

/// Lazy, finite sequence of decoded events. Ends after `[DONE]`, the end of
/// the body, or the first error.
pub struct MessageStream {
    inner: BoxStream<'static, Result<RemoteMessage, ApiError>>,
}

impl MessageStream {
    pub(crate) fn new(inner: BoxStream<'static, Result<RemoteMessage, ApiError>>) -> Self {
        Self { inner }
    }

    pub fn empty() -> Self {
        Self::new(futures::stream::empty().boxed())
    }

    /// Drains the stream and returns the content of the last text event.
    pub async fn last_text(mut self) -> Result<Option<String>, ApiError> {
        let mut last = None;
        while let Some(event) = self.next().await {
            if let RemoteMessage::Text(text) = event? {
                last = Some(text.content);
            }
        }
        Ok(last)
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}

impl Stream for MessageStream {
    type Item = Result<RemoteMessage, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
