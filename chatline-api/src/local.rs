use crate::codec::StoredMessage;
use crate::common::MessageStream;
use crate::error::ApiError;
use crate::error::Result;
use crate::services::CreateMessageRequest;
use crate::services::CreateMessageResponse;
use crate::services::CreateThreadRequest;
use crate::services::CreateThreadResponse;
use crate::services::LoadApi;
use crate::services::MessagesApi;
use crate::services::RemoteThread;
use crate::services::RunStreamRequest;
use crate::services::RunsApi;
use crate::services::ThreadsApi;
use crate::services::UpdateThreadRequest;
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Threads served when no service is configured.
pub fn fixture_threads() -> Vec<RemoteThread> {
    vec![
        RemoteThread {
            id: "thread-1".to_string(),
            title: "Chat".to_string(),
            is_archived: false,
            external_id: Some("external-id-1".to_string()),
        },
        RemoteThread {
            id: "thread-2".to_string(),
            title: "Chat 2".to_string(),
            is_archived: false,
            external_id: Some("external-id-2".to_string()),
        },
    ]
}

#[derive(Default)]
struct LocalState {
    threads: Vec<RemoteThread>,
    messages: HashMap<String, Vec<StoredMessage>>,
}

/// In-process stand-in for the conversation service. Nothing outlives the
/// process, and runs produce no events.
#[derive(Default)]
pub struct LocalBackend {
    state: Mutex<LocalState>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture_threads() -> Self {
        Self {
            state: Mutex::new(LocalState {
                threads: fixture_threads(),
                messages: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found() -> ApiError {
    ApiError::http_status(StatusCode::NOT_FOUND)
}

#[async_trait]
impl ThreadsApi for LocalBackend {
    async fn create(&self, request: CreateThreadRequest) -> Result<CreateThreadResponse> {
        let thread_id = Uuid::new_v4().to_string();
        self.lock().threads.push(RemoteThread {
            id: thread_id.clone(),
            title: String::new(),
            is_archived: false,
            external_id: request.external_id,
        });
        Ok(CreateThreadResponse { thread_id })
    }

    async fn update(&self, thread_id: &str, request: UpdateThreadRequest) -> Result<()> {
        let mut state = self.lock();
        let thread = state
            .threads
            .iter_mut()
            .find(|thread| thread.id == thread_id)
            .ok_or_else(not_found)?;
        if let Some(title) = request.title {
            thread.title = title;
        }
        if let Some(is_archived) = request.is_archived {
            thread.is_archived = is_archived;
        }
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.threads.retain(|thread| thread.id != thread_id);
        state.messages.remove(thread_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RemoteThread>> {
        Ok(self.lock().threads.clone())
    }
}

#[async_trait]
impl MessagesApi for LocalBackend {
    async fn create(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResponse> {
        let mut state = self.lock();
        if !state.threads.iter().any(|thread| thread.id == thread_id) {
            return Err(not_found());
        }
        let message_id = Uuid::new_v4().to_string();
        state
            .messages
            .entry(thread_id.to_string())
            .or_default()
            .push(StoredMessage {
                id: Some(message_id.clone()),
                parent_id: request.parent_id,
                format: request.format,
                content: request.content,
            });
        Ok(CreateMessageResponse { message_id })
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let state = self.lock();
        Ok(state
            .messages
            .get(thread_id)
            .map(|messages| messages.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RunsApi for LocalBackend {
    async fn stream(
        &self,
        _request: RunStreamRequest,
        _cancel: CancellationToken,
    ) -> Result<MessageStream> {
        Ok(MessageStream::empty())
    }
}

#[async_trait]
impl LoadApi for LocalBackend {
    async fn load_chat_message(
        &self,
        _chat_id: &str,
        _message: &str,
        _cancel: CancellationToken,
    ) -> Result<MessageStream> {
        Ok(MessageStream::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn message(parent_id: Option<&str>, text: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            parent_id: parent_id.map(str::to_string),
            format: "aui/v0".to_string(),
            content: json!({"text": text}),
        }
    }

    #[tokio::test]
    async fn messages_are_listed_newest_first() {
        let backend = LocalBackend::with_fixture_threads();
        let first = MessagesApi::create(&backend, "thread-1", message(None, "a"))
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        MessagesApi::create(&backend, "thread-1", message(Some(&first.message_id), "b"))
            .await
            .unwrap_or_else(|err| panic!("{err}"));

        let listed = MessagesApi::list(&backend, "thread-1")
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        let texts: Vec<_> = listed.iter().map(|m| m.content["text"].clone()).collect();
        assert_eq!(texts, vec![json!("b"), json!("a")]);
        assert_eq!(listed[0].parent_id.as_deref(), Some(first.message_id.as_str()));
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let backend = LocalBackend::new();
        let err = ThreadsApi::update(&backend, "missing", UpdateThreadRequest::default()).await;
        assert_matches!(err, Err(ApiError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND);
        let err = MessagesApi::create(&backend, "missing", message(None, "x")).await;
        assert_matches!(err, Err(ApiError::HttpStatus { .. }));
    }

    #[tokio::test]
    async fn delete_drops_thread_and_its_messages() {
        let backend = LocalBackend::new();
        let created = ThreadsApi::create(
            &backend,
            CreateThreadRequest {
                last_message_at: Utc::now(),
                external_id: None,
            },
        )
        .await
        .unwrap_or_else(|err| panic!("{err}"));
        MessagesApi::create(&backend, &created.thread_id, message(None, "a"))
            .await
            .unwrap_or_else(|err| panic!("{err}"));

        ThreadsApi::delete(&backend, &created.thread_id)
            .await
            .unwrap_or_else(|err| panic!("{err}"));

        assert!(ThreadsApi::list(&backend).await.unwrap_or_default().is_empty());
        assert!(
            MessagesApi::list(&backend, &created.thread_id)
                .await
                .unwrap_or_default()
                .is_empty()
        );
    }
}
