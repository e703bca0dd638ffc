//! The `aui/v0` envelope used to store thread messages remotely.
//!
//! The message id lives on the stored row, not in the encoded content, so a
//! decoded message always carries the id the service assigned.

use crate::common::ContentPart;
use crate::common::MessageMetadata;
use crate::common::Role;
use crate::common::ThreadMessage;
use crate::error::ApiError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub const AUI_V0_FORMAT: &str = "aui/v0";

/// A message row as returned by the message list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub format: String,
    pub content: Value,
}

/// A decoded history entry, oldest-first order is the caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedMessage {
    pub parent_id: Option<String>,
    pub message: ThreadMessage,
}

#[derive(Serialize, Deserialize)]
struct AuiV0Content {
    role: Role,
    content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<MessageMetadata>,
}

pub fn is_supported(stored: &StoredMessage) -> bool {
    stored.format == AUI_V0_FORMAT
}

pub fn encode(message: &ThreadMessage) -> Result<Value> {
    serde_json::to_value(AuiV0Content {
        role: message.role,
        content: message.content.clone(),
        metadata: message.metadata.clone(),
    })
    .map_err(|err| ApiError::Codec(err.to_string()))
}

pub fn decode(stored: StoredMessage) -> Result<ExportedMessage> {
    if !is_supported(&stored) {
        return Err(ApiError::Codec(format!(
            "unsupported message format `{}`",
            stored.format
        )));
    }
    let Some(id) = stored.id else {
        return Err(ApiError::Codec("stored message has no id".to_string()));
    };
    let content: AuiV0Content =
        serde_json::from_value(stored.content).map_err(|err| ApiError::Codec(err.to_string()))?;

    Ok(ExportedMessage {
        parent_id: stored.parent_id,
        message: ThreadMessage {
            id,
            role: content.role,
            content: content.content,
            metadata: content.metadata,
        },
    })
}
